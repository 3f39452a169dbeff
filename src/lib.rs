//! Dinner News - curated family-discussion news
//!
//! This crate aggregates RSS news feeds, asks a text-generation API to
//! curate and annotate five stories for family dinner discussions, caches
//! the result for a day, and serves it as a single JSON endpoint.

pub mod cache;
pub mod config;
pub mod curator;
pub mod enrich;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod routes;
pub mod selector;
