use std::sync::Arc;

use clap::Parser;
use ephra_auth::session::spawn_sweeper;
use ephra_core::{Clock, SystemClock};
use ephra_notifications::{ReminderDispatcher, TracingSink};
use ephra_server::config::loader::{DEFAULT_CONFIG_FILE, load_config};
use ephra_server::{ServerBuilder, Services, observability};

#[derive(Debug, Parser)]
#[command(name = "ephra-server", version, about = "Ephra booking core HTTP server")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, env = "EPHRA_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: String,
}

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    observability::init_tracing();

    let args = Args::parse();
    let cfg = match load_config(Some(&args.config)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    tracing::info!(path = %args.config, "Configuration loaded");
    observability::apply_logging_level(&cfg.logging.level);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let services = match Services::from_config(&cfg, clock.clone()).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Server initialization failed: {e}");
            std::process::exit(2);
        }
    };

    let sweeper = spawn_sweeper(services.sessions.clone(), cfg.auth.session.sweep_interval);

    let poll_interval = cfg.notifications.poll_interval;
    let dispatcher = ReminderDispatcher::new(services.reminders.clone(), TracingSink, clock);
    let dispatch_task = tokio::spawn(async move { dispatcher.run(poll_interval).await });

    let server = ServerBuilder::new().with_config(cfg).build(services.state);
    if let Err(err) = server.run().await {
        eprintln!("Server error: {err}");
    }

    sweeper.abort();
    dispatch_task.abort();
}
