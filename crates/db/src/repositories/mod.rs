//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod job_repo;
pub mod quote_repo;
pub mod user_repo;

pub use job_repo::JobRepo;
pub use quote_repo::QuoteRepo;
pub use user_repo::UserRepo;
