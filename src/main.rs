use std::process;

use tracing_subscriber::EnvFilter;

use jobdesk::{cli, config::Config, hooks::HookRegistry, storage::Storage, workflow::Workflow};

/// Environment variable holding the log filter, e.g. `JOBDESK_LOG=debug`.
const LOG_ENV: &str = "JOBDESK_LOG";

fn main() {
    init_tracing();

    let config = Config::load().unwrap_or_else(|e| fail(&e));
    let path = config.database_path().unwrap_or_else(|e| fail(&e));
    let calendar = config.calendar().unwrap_or_else(|e| fail(&e));

    let storage = match Storage::open(&path) {
        Ok(s) => s,
        Err(e) => fail(&format!("Failed to open {}: {e}", path.display())),
    };

    let workflow = Workflow::new(storage, calendar, HookRegistry::new());

    if let Err(e) = cli::run(&config, &workflow) {
        eprintln!("Error: {e}");
        process::exit(e.code);
    }
}

/// Logs go to stderr so command output stays clean on stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {message}");
    process::exit(1);
}
