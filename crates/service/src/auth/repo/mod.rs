//! Persistence adapters implementing [`super::repository::AccountRepository`].

pub mod seaorm;
