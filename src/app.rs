use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::domain::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::AppSettings;
use crate::interfaces::console::run_console;

pub fn run() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(err) = start() {
        error!(error = %err, "MeterLens exited with an error");
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn start() -> Result<()> {
    let settings = AppSettings::load()?;
    let state = bootstrap::setup(settings)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_console(state))
}
