//! Domain model for the customer data-access core.
//!
//! # Responsibility
//! - Define the canonical `Customer` record shared by repository and callers.
//!
//! # Invariants
//! - Identity is assigned by storage, never by callers.
//! - Customers are never updated or deleted through this core.

pub mod customer;
