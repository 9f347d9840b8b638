//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into role-guarded workflow APIs.
//! - Keep hosts decoupled from storage details.
//! - Emit one ok/error log event per workflow mutation.
//!
//! # Invariants
//! - Every mutating operation checks the caller's role before reading.
//! - Validation completes before the first write.

pub mod advisor_service;
pub mod authz;
pub mod catalog_service;
pub mod errors;
pub mod rules;
pub mod section_service;
pub mod student_service;

use errors::ErrorKind;
use log::{info, warn};
use std::fmt::Display;

/// Logs the outcome of one workflow mutation as a single `key=value` line.
///
/// `fields` is appended verbatim and should already be `key=value` pairs.
fn log_outcome<T, E: Display>(
    event: &'static str,
    module: &'static str,
    fields: &str,
    result: &Result<T, E>,
    kind: impl FnOnce(&E) -> ErrorKind,
) {
    match result {
        Ok(_) => info!("event={event} module={module} status=ok {fields}"),
        Err(err) => warn!(
            "event={event} module={module} status=error {fields} error_code={} error={err}",
            kind(err)
        ),
    }
}
