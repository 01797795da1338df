//! Customer domain model.
//!
//! # Responsibility
//! - Define the customer record persisted in the `customers` table.
//! - Validate caller input before it reaches storage.
//!
//! # Invariants
//! - `id == 0` means "not persisted yet"; storage assigns a positive id.
//! - `name` and `email` are non-empty after trimming whitespace.
//! - `email` is the exact-match lookup key (case-sensitive).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned identifier.
pub type CustomerId = i64;

/// Id carried by customers that have not been persisted.
pub const UNASSIGNED_CUSTOMER_ID: CustomerId = 0;

/// A person who can place orders elsewhere in the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Assigned by storage on creation. Ignored on create input.
    pub id: CustomerId,
    /// Display name. Not unique.
    pub name: String,
    /// Unique lookup key.
    pub email: String,
}

/// Validation failures for customer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerValidationError {
    EmptyName,
    EmptyEmail,
}

impl Display for CustomerValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "customer name must not be empty"),
            Self::EmptyEmail => write!(f, "customer email must not be empty"),
        }
    }
}

impl Error for CustomerValidationError {}

impl Customer {
    /// Creates an unpersisted customer.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UNASSIGNED_CUSTOMER_ID,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Checks required fields.
    ///
    /// `id` is not inspected: it is ignored on create and owned by storage.
    pub fn validate(&self) -> Result<(), CustomerValidationError> {
        if self.name.trim().is_empty() {
            return Err(CustomerValidationError::EmptyName);
        }
        if self.email.trim().is_empty() {
            return Err(CustomerValidationError::EmptyEmail);
        }
        Ok(())
    }

    /// Returns whether storage has assigned an id.
    pub fn is_persisted(&self) -> bool {
        self.id > UNASSIGNED_CUSTOMER_ID
    }
}
