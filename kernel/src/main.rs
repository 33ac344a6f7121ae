// =============================================================================
// KERNELSIM KERNEL - kernel/src/main.rs
// Kernel simulator executable entry point: supervisor, IC, and app modes
// =============================================================================

// External runtime dependencies
use clap::{Arg, ArgMatches, Command};
use env_logger::Builder as LogBuilder;
use log::{error, LevelFilter};
use std::process;

// Kernelsim library imports
use kernelsim::{app, inter, supervisor};
use shared::{AppConfiguration, InterruptConfiguration, KernelConfiguration};

#[tokio::main]
async fn main() {
    LogBuilder::from_default_env()
        .filter_level(LevelFilter::Info)
        .init();

    let matches = match parse_command_line() {
        Ok(matches) => matches,
        Err(e) => {
            e.print().ok();
            process::exit(1);
        }
    };

    let result = match matches.get_one::<String>("mode").map(String::as_str) {
        None => run_supervisor(&matches).await,
        Some("inter") => inter::run(InterruptConfiguration::default()).await,
        Some("app") => run_app(&matches).await,
        Some(other) => {
            error!("unknown mode '{}'; expected no mode, 'inter', or 'app <id>'", other);
            process::exit(1);
        }
    };

    if let Err(e) = result {
        error!("kernelsim failed: {:#}", e);
        process::exit(2);
    }
}

fn parse_command_line() -> Result<ArgMatches, clap::Error> {
    Command::new("kernelsim")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Micro-kernel simulator: run with no mode for the kernel supervisor")
        .arg(Arg::new("mode").value_name("MODE").help("Child role: 'inter' or 'app'"))
        .arg(Arg::new("id").value_name("ID").help("Application id for 'app' mode"))
        .arg(
            Arg::new("sfss")
                .long("sfss")
                .value_name("HOST:PORT")
                .help("SFSS endpoint (default 127.0.0.1:8888)"),
        )
        .arg(
            Arg::new("slot-dir")
                .long("slot-dir")
                .value_name("DIR")
                .help("Reply slot directory (default /tmp/kernelsim)"),
        )
        .try_get_matches()
}

async fn run_supervisor(matches: &ArgMatches) -> anyhow::Result<()> {
    let mut config = KernelConfiguration::default();
    if let Some(endpoint) = matches.get_one::<String>("sfss") {
        let Some((host, port)) = endpoint.rsplit_once(':') else {
            error!("--sfss expects HOST:PORT, got '{}'", endpoint);
            process::exit(1);
        };
        let Ok(port) = port.parse() else {
            error!("--sfss port '{}' is not a number", port);
            process::exit(1);
        };
        config.sfss_host = host.to_string();
        config.sfss_port = port;
    }
    if let Some(dir) = matches.get_one::<String>("slot-dir") {
        config.slot_dir = dir.clone();
    }
    supervisor::run(config).await
}

async fn run_app(matches: &ArgMatches) -> anyhow::Result<()> {
    let n_apps = KernelConfiguration::default().n_apps;
    let id = match matches.get_one::<String>("id").map(|s| s.parse::<usize>()) {
        Some(Ok(id)) if (1..=n_apps).contains(&id) => id,
        _ => {
            error!("app mode requires an id in 1..={}", n_apps);
            process::exit(1);
        }
    };
    let mut config = AppConfiguration::default();
    if let Some(dir) = matches.get_one::<String>("slot-dir") {
        config.slot_dir = dir.clone();
    }
    app::run(id, config).await
}
