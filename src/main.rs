use std::process::ExitCode;
use std::sync::Arc;

use tracing::error;

use jobfront::config::{load_config, print_schema};
use jobfront::startup::run;
use jobfront::utils::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    if std::env::args().any(|arg| arg == "--schema") {
        return match print_schema() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Failed to render configuration schema: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let shipper = match init_logging(&config.logging) {
        Ok(shipper) => shipper,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(Arc::new(config)).await;
    if let Err(e) = &outcome {
        error!("Startup failed: {}", e);
    }

    if let Some(shipper) = shipper {
        shipper.shutdown().await;
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
