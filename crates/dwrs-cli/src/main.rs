use dwrs_core::logging;

mod cli;

#[tokio::main]
async fn main() {
    // Log to the state dir; fall back to stderr if it is not writable.
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable: {:#}", e);
    }

    match cli::run_from_args().await {
        Ok(status) => std::process::exit(status.code()),
        Err(err) => {
            eprintln!("dwrs error: {:#}", err);
            std::process::exit(cli::RunStatus::InputError.code());
        }
    }
}
