use clap::Parser;
use prefect_settings::cli::commands::EXIT_FATAL;
use prefect_settings::cli::{run, Cli, Session};
use prefect_settings::log_error_with_context;
use prefect_settings::logging::{init_logging, level_follows_settings, LoggingConfig, LoggingHook};
use prefect_settings::settings::context::ContextHook;
use prefect_settings::settings::{EnvSnapshot, Registry, ENV_PREFIX};
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let logging_config = LoggingConfig {
        level: cli.log_level.clone().unwrap_or_else(|| "warn".to_string()),
        json: cli.log_json,
    };
    if let Err(e) = init_logging(&logging_config) {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(EXIT_FATAL);
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Starting prefect");

    // --log-level and RUST_LOG win over PREFECT_LOGGING_LEVEL
    let rust_log = std::env::var("RUST_LOG").ok();
    let hook: Option<Arc<dyn ContextHook>> =
        if level_follows_settings(cli.log_level.as_deref(), rust_log.as_deref()) {
            Some(Arc::new(LoggingHook::new(logging_config.level.clone())))
        } else {
            None
        };

    let exit_code = match execute_command(&cli, hook) {
        Ok(code) => code,
        Err(e) => {
            log_error_with_context!(e, "Command execution failed");
            eprintln!("Error: {e:#}");
            EXIT_FATAL
        }
    };

    process::exit(exit_code);
}

/// Execute the CLI command against the process environment
fn execute_command(cli: &Cli, hook: Option<Arc<dyn ContextHook>>) -> anyhow::Result<i32> {
    let registry = Registry::builtin();
    let env = EnvSnapshot::from_process(ENV_PREFIX);
    let session = Session::discover(registry, env, cli.profile.clone())?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(cli, &session, hook, &mut out)
}
