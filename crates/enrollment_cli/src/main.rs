//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `enrollment_core` linkage, configuration and database bootstrap.
//! - Keep output deterministic for quick local sanity checks.

use enrollment_core::{
    core_version, init_logging_from_config, open_db, open_db_in_memory, CoreConfig, SystemClock,
    Term,
};
use log::info;
use std::process::ExitCode;

fn main() -> ExitCode {
    // A missing .env file is fine; real environment variables still apply.
    dotenvy::dotenv().ok();
    let config = CoreConfig::from_env();

    match init_logging_from_config(&config) {
        Ok(enabled) => info!("event=cli_start module=cli status=ok file_logging={enabled}"),
        Err(err) => {
            eprintln!("enrollment logging error: {err}");
            return ExitCode::FAILURE;
        }
    }

    let opened = match config.db_path.as_deref() {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    };
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("enrollment database error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let schema_version = match enrollment_core::db::current_user_version(&conn) {
        Ok(version) => version,
        Err(err) => {
            eprintln!("enrollment database error: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("enrollment_core version={}", core_version());
    println!("enrollment_core schema_version={schema_version}");
    println!("enrollment_core term={}", Term::current(&SystemClock));
    ExitCode::SUCCESS
}
