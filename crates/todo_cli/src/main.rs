//! Startup entry point.
//!
//! # Responsibility
//! - Resolve store/log configuration from the environment.
//! - Open the store, which applies migrations, and fail fast on errors.
//! - Print a one-line summary so wiring can be checked from a terminal.

use log::error;
use std::error::Error;
use std::process::ExitCode;
use todo_core::db::migrations::current_version;
use todo_core::db::open_db;
use todo_core::{
    core_version, init_logging, LoggingConfig, OpContext, SqliteTaskRepository, StoreConfig,
    TaskService,
};

fn main() -> ExitCode {
    let store = StoreConfig::from_env();

    // Logging failures are reported but never block startup.
    match LoggingConfig::from_env(store.default_log_dir()) {
        Ok(config) => {
            if let Err(err) = init_logging(&config) {
                eprintln!("logging disabled: {err}");
            }
        }
        Err(err) => eprintln!("logging disabled: {err}"),
    }

    match run(&store) {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=startup module=cli status=error error={err}");
            eprintln!("startup failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(store: &StoreConfig) -> Result<String, Box<dyn Error>> {
    let db_path = store.ensure_store_file()?;
    let conn = open_db(db_path)?;
    let schema_version = current_version(&conn)?;

    let service = TaskService::new(SqliteTaskRepository::try_new(&conn)?);
    let tasks = service.get_all(&OpContext::background())?;

    Ok(format!(
        "todo_core version={} store={} schema_version={} tasks={}",
        core_version(),
        db_path.display(),
        schema_version,
        tasks.len()
    ))
}
