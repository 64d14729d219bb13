use chrono::{DateTime, Local};
use log::warn;
use std::fmt::Write;

pub const FALLBACK_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Timestamp-based clip identifier, e.g. `c2024-05-01-10-20-30` for prefix `c`.
///
/// An unparseable `format_str` falls back to `FALLBACK_TIMESTAMP_FORMAT` instead of panicking.
pub fn clip_id(prefix: &str, format_str: &str) -> String {
    let now: DateTime<Local> = Local::now();
    let mut id = prefix.to_string();
    if write!(id, "{}", now.format(format_str)).is_err() {
        warn!("⚠️ Timestamp format '{}' is invalid; using '{}'.", format_str, FALLBACK_TIMESTAMP_FORMAT);
        id = format!("{}{}", prefix, now.format(FALLBACK_TIMESTAMP_FORMAT));
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_id_uses_prefix_and_format() {
        let id = clip_id("c", "%Y-%m-%d-%H-%M-%S");
        assert!(id.starts_with('c'));
        assert_eq!(id.len(), 1 + "2024-05-01-10-20-30".len());
        assert_eq!(id.matches('-').count(), 5);
    }

    #[test]
    fn invalid_format_falls_back_instead_of_panicking() {
        let id = clip_id("c", "%Q-%Y");
        assert!(id.starts_with('c'));
        assert_eq!(id.len(), 1 + "2024-05-01-10-20-30".len());
    }
}
