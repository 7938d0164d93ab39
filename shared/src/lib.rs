//! Shared types and models for the Site Inventory Ledger
//!
//! This crate contains the domain types and the pure stock rules shared between
//! the backend, the browser helpers (via WASM), and other components.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
