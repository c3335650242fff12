//! Authentication primitives.
//!
//! - [`jwt`] -- HS256 access-token validation (and generation, for tooling
//!   and tests). Tokens are issued by the external identity provider that
//!   shares `JWT_SECRET` with this service.

pub mod jwt;
