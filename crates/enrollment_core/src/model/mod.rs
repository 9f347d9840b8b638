//! Domain model for term enrollment.
//!
//! # Responsibility
//! - Define the entities the enrollment rules inspect.
//! - Keep status vocabularies closed (enums, not strings).
//!
//! # Invariants
//! - Every entity is identified by a stable `Uuid`.
//! - An enrollment record exclusively owns its items; items refer back to the
//!   record by id only.

pub mod catalog;
pub mod enrollment;
pub mod principal;
pub mod section;
