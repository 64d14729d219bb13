use env_logger::Builder;
use log::LevelFilter;
use crate::config_loader::MasterConfig;

fn level_from_name(name: &str) -> Option<LevelFilter> {
    match name.to_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// `--debug` wins over the config's `log_level`, which wins over `info`.
pub fn resolve_level(config: Option<&MasterConfig>, debug_flag: bool) -> LevelFilter {
    if debug_flag {
        return LevelFilter::Debug;
    }
    match config.and_then(|c| c.app_settings.log_level.as_deref()) {
        Some(name) => level_from_name(name).unwrap_or_else(|| {
            eprintln!("Unrecognized log level '{}', defaulting to info.", name);
            LevelFilter::Info
        }),
        None => LevelFilter::Info,
    }
}

pub fn initialize_logging(config: Option<&MasterConfig>, cli_matches: &clap::ArgMatches) {
    let mut builder = Builder::new();
    builder.filter_level(resolve_level(config, cli_matches.get_flag("debug")));
    builder.try_init().unwrap_or_else(|e| {
        eprintln!("Failed to initialize logger: {}. Logging might not work as expected.", e);
    });
}
