//! Domain types, normalizer, and Schema Contract for the bibliographic
//! discovery service. No database dependency — everything here is a pure
//! function or a plain data type; `bib-index`, `bib-plan`, `bib-exec`,
//! `bib-sessions`, and `bib-enrich` implement the ports declared in
//! [`ports`] against a concrete store.

pub mod config;
pub mod error;
pub mod model;
pub mod normalizer;
pub mod ports;
pub mod retry;
pub mod schema;

pub use error::{CoreError, Result};
