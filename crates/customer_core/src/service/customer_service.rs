//! Customer use-case service.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Service layer remains storage-agnostic.

use crate::context::OpContext;
use crate::model::customer::Customer;
use crate::repo::customer_repo::{CustomerRepository, RepoResult};

/// Use-case wrapper over a customer repository.
pub struct CustomerService<R: CustomerRepository> {
    repo: R,
}

impl<R: CustomerRepository> CustomerService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new customer from raw name/email input.
    ///
    /// # Contract
    /// - Returns the persisted customer with its assigned id.
    /// - Duplicate emails surface as `RepoError::ConstraintViolation`.
    pub fn register(
        &self,
        ctx: &OpContext,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> RepoResult<Customer> {
        self.repo.create_customer(ctx, Customer::new(name, email))
    }

    /// Looks up one customer; absence is `RepoError::NotFound`.
    pub fn find_by_email(&self, ctx: &OpContext, email: &str) -> RepoResult<Customer> {
        self.repo.get_customer_by_email(ctx, email)
    }

    /// Same lookup with absence mapped to `Ok(None)`.
    pub fn find_by_email_opt(&self, ctx: &OpContext, email: &str) -> RepoResult<Option<Customer>> {
        match self.repo.get_customer_by_email(ctx, email) {
            Ok(customer) => Ok(Some(customer)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Returns the wrapped repository, e.g. to close it.
    pub fn into_inner(self) -> R {
        self.repo
    }
}
