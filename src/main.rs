// src/main.rs

use rollout::errors::Error;
use rollout::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("rollout error: {err:?}");
        std::process::exit(2);
    }

    if let Err(err) = run(args).await {
        eprintln!("rollout error: {err}");
        std::process::exit(exit_code(&err));
    }
}

/// Exit codes: 2 for configuration problems (nothing was attempted), 1 for a
/// failed deployment.
fn exit_code(err: &Error) -> i32 {
    match err {
        Error::Config(_)
        | Error::EmptyTaskList
        | Error::CommandValidation { .. }
        | Error::Toml(_)
        | Error::Io(_) => 2,
        Error::StageFailed { .. } | Error::Other(_) => 1,
    }
}
