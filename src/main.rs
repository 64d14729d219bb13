use rsrec::cli;
use rsrec::common::logging_setup;
use rsrec::config_loader;
use rsrec::operations;
use log::{info, error, debug};
use anyhow::{anyhow, Result};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    let main_start_time = Instant::now();
    let matches = cli::build_cli().get_matches();
    let config_path = matches.get_one::<String>("config").map(|s| s.as_str());

    let config_load_start_time = Instant::now();
    let master_config = match config_loader::load_or_default(config_path) {
        Ok(cfg) => {
            logging_setup::initialize_logging(Some(&cfg), &matches);
            debug!("Configuration ready in {:?}", config_load_start_time.elapsed());
            cfg
        }
        Err(e) => {
            logging_setup::initialize_logging(None, &matches);
            error!("❌ Failed to load configuration: {:#}. Exiting.", e);
            return Ok(());
        }
    };

    let Some((operation_name, sub_matches)) = matches.subcommand() else {
        info!("🤔 No subcommand provided. Nothing to do.");
        return Ok(());
    };
    debug!("🎬 Dispatching to subcommand: {}", operation_name);
    let op_start_time = Instant::now();

    let op_result: Result<()> = match operation_name {
        "record" => operations::record_op::handle_record_cli(&master_config, sub_matches).await,
        "replay" => operations::replay_op::handle_replay_cli(&master_config, sub_matches).await,
        "watch" => operations::watch_op::handle_watch_cli(&master_config, sub_matches).await,
        "clip" => operations::clip_op::handle_clip_cli(&master_config, sub_matches).await,
        other => Err(anyhow!("Subcommand '{}' not implemented.", other)),
    };

    // Failures are reported in the log; the exit status stays 0.
    match op_result {
        Ok(()) => info!("✅ Operation '{}' completed successfully in {:?}.", operation_name, op_start_time.elapsed()),
        Err(e) => error!("❌ Operation '{}' failed after {:?}: {:#}", operation_name, op_start_time.elapsed(), e),
    }

    info!("🏁 rsrec finished in {:?}.", main_start_time.elapsed());
    Ok(())
}
