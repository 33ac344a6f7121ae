// =============================================================================
// SFSS SERVER - sfss/src/main.rs
// Simple File Storage Service executable entry point
// =============================================================================

// External runtime dependencies
use clap::{Arg, Command};
use env_logger::Builder as LogBuilder;
use log::{error, LevelFilter};
use std::process;

// SFSS library imports
use sfss::SfssServer;
use shared::SfssConfiguration;

#[tokio::main]
async fn main() {
    LogBuilder::from_default_env()
        .filter_level(LevelFilter::Info)
        .init();

    let matches = match Command::new("sfss_server")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Simple File Storage Service: UDP file and directory server")
        .arg(
            Arg::new("root")
                .value_name("ROOT-DIR")
                .required(true)
                .help("Directory served as the SFSS root (holds A0..AN)"),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .value_name("ADDR")
                .help("Socket address to bind (default 0.0.0.0:8888)"),
        )
        .try_get_matches()
    {
        Ok(m) => m,
        Err(e) => {
            e.print().ok();
            process::exit(1);
        }
    };

    let mut config = SfssConfiguration {
        root_dir: matches.get_one::<String>("root").cloned().unwrap_or_default(),
        ..SfssConfiguration::default()
    };
    if let Some(bind) = matches.get_one::<String>("bind") {
        config.bind_addr = bind.clone();
    }

    let server = match SfssServer::initialize(&config).await {
        Ok(server) => server,
        Err(e) => {
            error!("SFSS startup failed: {:#}", e);
            process::exit(2);
        }
    };

    if let Err(e) = server.run().await {
        error!("SFSS terminated: {:#}", e);
        process::exit(2);
    }
}
