//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the customer data access contract.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Customer::validate()` before I/O.
//! - Repository APIs return semantic errors (`NotFound`,
//!   `ConstraintViolation`) distinct from transport errors.

pub mod customer_repo;
