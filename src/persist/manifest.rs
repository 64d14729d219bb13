use crate::core::capture_source::{CameraIntrinsics, StreamIntrinsics};
use crate::errors::AppError;
use crate::session_config::SessionConfig;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// JSON sidecar describing one saved clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipManifest {
    pub color_file: String,
    pub depth_file: String,
    pub frequency: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intrinsics_color: Option<StreamIntrinsics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intrinsics_depth: Option<StreamIntrinsics>,
    pub time: String,
    pub time_sec: f64,
    pub width: u32,
}

impl ClipManifest {
    /// Pretty JSON with keys sorted at every level.
    pub fn to_json(&self) -> Result<String, AppError> {
        // serde_json::Value maps are BTreeMaps, which gives a stable key order.
        let value = serde_json::to_value(self)
            .map_err(|e| AppError::Media(format!("Failed to encode manifest: {}", e)))?;
        serde_json::to_string_pretty(&value)
            .map_err(|e| AppError::Media(format!("Failed to encode manifest: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self, AppError> {
        serde_json::from_str(json).map_err(|e| AppError::Config(format!("Invalid clip manifest: {}", e)))
    }

    /// Reads a manifest and returns it together with the directory its files live in.
    pub fn load(path: &Path) -> Result<(Self, PathBuf), AppError> {
        let json = fs::read_to_string(path)
            .map_err(|e| AppError::Io(format!("Failed to read manifest '{}': {}", path.display(), e)))?;
        let manifest = Self::from_json(&json)?;
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let dir = absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        debug!("Loaded manifest {:?} from {}", manifest, path.display());
        Ok((manifest, dir))
    }

    pub fn color_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.color_file)
    }

    pub fn depth_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.depth_file)
    }

    pub fn intrinsics(&self) -> CameraIntrinsics {
        CameraIntrinsics {
            color: self.intrinsics_color.clone(),
            depth: self.intrinsics_depth.clone(),
        }
    }

    /// Session settings to re-encode this clip with (used when trimming).
    pub fn session_config(&self) -> Result<SessionConfig, AppError> {
        SessionConfig::new(self.width, self.height, self.frequency, self.time_sec)
    }

    pub fn frame_count(&self) -> usize {
        (self.time_sec * self.frequency as f64).round() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClipManifest {
        ClipManifest {
            width: 640,
            height: 360,
            time_sec: 2.0,
            frequency: 30,
            time: "2024-05-01-10-20-30".to_string(),
            depth_file: "2024-05-01-10-20-30-depth.npz".to_string(),
            color_file: "2024-05-01-10-20-30-rgb.avi".to_string(),
            intrinsics_color: None,
            intrinsics_depth: None,
        }
    }

    #[test]
    fn json_keys_are_sorted_and_indented() {
        let json = sample().to_json().unwrap();
        let keys: Vec<&str> = json
            .lines()
            .filter_map(|l| l.trim().strip_prefix('"'))
            .filter_map(|l| l.split('"').next())
            .collect();
        assert_eq!(
            keys,
            vec!["color_file", "depth_file", "frequency", "height", "time", "time_sec", "width"]
        );
        assert!(json.contains("\n  \"time_sec\": 2.0"));
        assert!(!json.contains("intrinsics"));
    }

    #[test]
    fn serialization_is_stable() {
        let m = sample();
        assert_eq!(m.to_json().unwrap(), m.to_json().unwrap());
        let reparsed = ClipManifest::from_json(&m.to_json().unwrap()).unwrap();
        assert_eq!(reparsed.to_json().unwrap(), m.to_json().unwrap());
    }

    #[test]
    fn intrinsics_are_nested_and_sorted() {
        let mut m = sample();
        m.intrinsics_depth = Some(StreamIntrinsics {
            fx: 385.5,
            fy: 385.5,
            ppx: 320.0,
            ppy: 180.0,
            width: 640,
            height: 360,
            model: "BrownConrady".to_string(),
            coeffs: vec![0.0; 5],
        });
        let json = m.to_json().unwrap();
        let depth_at = json.find("\"intrinsics_depth\"").unwrap();
        assert!(json.find("\"height\"").unwrap() < depth_at);
        assert!(depth_at < json.find("\"time\"").unwrap());
        assert!(json.find("\"coeffs\"").unwrap() < json.find("\"fx\"").unwrap());
        assert_eq!(ClipManifest::from_json(&json).unwrap(), m);
    }

    #[test]
    fn accepts_manifests_without_optional_fields() {
        let json = r#"{"color_file": "a-rgb.avi", "depth_file": "a-depth.npz", "frequency": 30,
                       "height": 360, "time": "a", "time_sec": 10.0, "width": 640}"#;
        let m = ClipManifest::from_json(json).unwrap();
        assert_eq!(m.frame_count(), 300);
        assert_eq!(m.color_path(Path::new("/data")), PathBuf::from("/data/a-rgb.avi"));
        assert!(m.intrinsics().is_empty());
    }
}
