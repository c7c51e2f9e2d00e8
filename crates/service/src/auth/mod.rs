//! Auth module: three-layer architecture (domain, repository, service).
//!
//! [`password::CredentialHasher`] and [`token::TokenManager`] are pure and
//! safe to share across tasks; [`service::AccountService`] orchestrates them
//! over an [`repository::AccountRepository`].

pub mod domain;
pub mod errors;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;
pub mod repo;

pub use domain::Subject;
pub use errors::{AuthError, StoreError, TokenError};
pub use password::CredentialHasher;
pub use service::{AccountService, AuthConfig, OwnershipPolicy};
pub use token::TokenManager;
