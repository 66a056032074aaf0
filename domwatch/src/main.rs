//! Entry point for the `domwatch` supervisor.

use std::process::ExitCode;

use clap::Parser;
use domwatch::{app, cli::Args, logging};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Help and version go to stdout and are not failures.
            let code = u8::from(e.use_stderr());
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    if let Err(e) = logging::init(&args.log_level, args.log_format) {
        eprintln!("ERROR: {e}");
        return ExitCode::from(e.exit_code());
    }

    info!(version = env!("CARGO_PKG_VERSION"), domain = %args.name, "domwatch starting");

    match app::run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "domwatch stopped");
            ExitCode::from(e.exit_code())
        }
    }
}
