//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `customer_core` linkage and, optionally, that a database is
//!   reachable with a ready customer schema.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `customer_cli [CONNECTION_STRING]`
//! Logging is enabled when `CUSTOMER_LOG_DIR` (absolute) is set;
//! `CUSTOMER_LOG_LEVEL` overrides the build-mode default.

use customer_core::{OpContext, SqliteCustomerRepository};
use std::process::ExitCode;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var("CUSTOMER_LOG_DIR") {
        let level = std::env::var("CUSTOMER_LOG_LEVEL")
            .unwrap_or_else(|_| customer_core::default_log_level().to_string());
        if let Err(err) = customer_core::init_logging(&level, &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("customer_core ping={}", customer_core::ping());
    println!("customer_core version={}", customer_core::core_version());

    let Some(connection_string) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    let ctx = OpContext::with_timeout(PROBE_TIMEOUT);
    match SqliteCustomerRepository::open(&ctx, &connection_string).and_then(|repo| repo.close()) {
        Ok(()) => {
            log::info!("event=cli_probe module=cli status=ok");
            println!("customer_core schema=ready");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("event=cli_probe module=cli status=error error={err}");
            eprintln!("customer_core schema=unavailable error={err}");
            ExitCode::FAILURE
        }
    }
}
