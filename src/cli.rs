use clap::{Arg, ArgAction, Command};
use log::debug;
use std::time::Instant;

fn display_arg() -> Arg {
    Arg::new("display")
        .short('d')
        .long("display")
        .value_name("METHOD")
        .help("How depth is shown next to color: 'stack' or 'blend'")
        .value_parser(["stack", "blend"])
        .default_value("stack")
        .action(ArgAction::Set)
}

fn manifest_arg() -> Arg {
    Arg::new("json")
        .value_name("JSON")
        .help("Clip manifest written by 'record' or 'clip'")
        .required(true)
        .action(ArgAction::Set)
}

pub fn build_cli() -> Command {
    debug!("⚙️ Building CLI interface...");
    let start_time = Instant::now();
    let cmd = Command::new("rsrec")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Record, replay and trim color+depth clips from a RealSense camera.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom configuration file")
                .global(true)
                .action(ArgAction::Set)
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug logging")
                .global(true)
                .action(ArgAction::SetTrue)
        )
        .subcommand(
            Command::new("record")
                .about("Live preview; press 'r' to record a fixed-length clip")
                .arg(
                    Arg::new("width")
                        .short('w')
                        .long("width")
                        .value_name("PIXELS")
                        .help("Frame width (424, 640, 848 or 1280)")
                        .value_parser(clap::value_parser!(u32))
                        .action(ArgAction::Set)
                )
                .arg(
                    Arg::new("height")
                        .long("height")
                        .value_name("PIXELS")
                        .help("Frame height (defaults to the usual height for the width)")
                        .value_parser(clap::value_parser!(u32))
                        .action(ArgAction::Set)
                )
                .arg(
                    Arg::new("time")
                        .short('t')
                        .long("time")
                        .value_name("SECONDS")
                        .help("Length of each recording")
                        .value_parser(clap::value_parser!(f64))
                        .default_value("10")
                        .action(ArgAction::Set)
                )
                .arg(
                    Arg::new("freq")
                        .short('f')
                        .long("freq")
                        .value_name("HZ")
                        .help("Capture frequency")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("30")
                        .action(ArgAction::Set)
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("out")
                        .value_name("DIR")
                        .help("Output directory for clips")
                        .action(ArgAction::Set)
                )
                .arg(display_arg())
                .arg(
                    Arg::new("countdown")
                        .long("countdown")
                        .help("Wait a few seconds after 'r' before recording")
                        .action(ArgAction::SetTrue)
                )
                .arg(
                    Arg::new("synthetic")
                        .long("synthetic")
                        .help("Use a generated test pattern instead of a camera")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("replay")
                .about("Plays a saved clip at its recorded frequency")
                .arg(manifest_arg())
                .arg(display_arg())
        )
        .subcommand(
            Command::new("watch")
                .about("Steps through a saved clip with 'a' and 'd'")
                .arg(manifest_arg())
                .arg(display_arg())
        )
        .subcommand(
            Command::new("clip")
                .about("Trims frames [start, end) of a saved clip into a new clip")
                .arg(manifest_arg())
                .arg(
                    Arg::new("start")
                        .value_name("START")
                        .help("First frame to keep")
                        .required(true)
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                )
                .arg(
                    Arg::new("end")
                        .value_name("END")
                        .help("One past the last frame to keep")
                        .required(true)
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("out")
                        .value_name("DIR")
                        .help("Output directory for the trimmed clip")
                        .action(ArgAction::Set)
                )
        );
    debug!("✅ CLI interface built in {:?}", start_time.elapsed());
    cmd
}
