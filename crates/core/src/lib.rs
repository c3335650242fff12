//! Domain core for the Plumbers Portal job marketplace.
//!
//! Holds the entity types, request validation, the in-memory fallback search
//! pipeline, subscription-tier policy, and the ports (traits) through which
//! the API and the index-sync worker reach the document store, the search
//! index and the geocoder. Nothing in this crate performs I/O.

pub mod error;
pub mod fallback;
pub mod geo;
pub mod index_record;
pub mod job;
pub mod ports;
pub mod quote;
pub mod roles;
pub mod search_params;
pub mod slug;
pub mod tier;
pub mod types;
pub mod user;
