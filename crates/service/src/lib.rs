//! Account service core: credential hashing, session tokens and the
//! register/login/update/delete use cases over a persistence port.
//! - Framework independent; the HTTP layer lives in the `server` crate.
//! - Storage is reached only through [`auth::repository::AccountRepository`].

pub mod auth;
