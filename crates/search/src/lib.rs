//! Algolia-backed job and tradesperson search.
//!
//! - [`client`] -- REST client for the Algolia search and indexing endpoints.
//! - [`query`] -- translation of a [`portal_core::ports::JobIndexQuery`] into
//!   an Algolia search request, including replica selection for sorting.
//! - [`index`] -- [`AlgoliaIndex`], the `SearchIndex` port implementation.

pub mod client;
pub mod index;
pub mod query;

pub use client::{AlgoliaClient, AlgoliaConfig, AlgoliaError};
pub use index::AlgoliaIndex;
