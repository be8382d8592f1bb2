//! Deterministic, reversible per-field normalization rules (spec.md §4.1).
//! Pure functions only — the sole I/O is the alias map loaded at startup.

pub mod alias;
pub mod date;
pub mod text;

pub use alias::AliasMap;
pub use date::normalize_date;
pub use text::{casefold_key, normalize_agent, normalize_place, normalize_publisher};
