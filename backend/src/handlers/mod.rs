//! HTTP request handlers

pub mod health;
pub mod movements;
pub mod products;
pub mod reports;
pub mod shopping_lists;
pub mod sites;
pub mod suppliers;

pub use health::*;
pub use movements::*;
pub use products::*;
pub use reports::*;
pub use shopping_lists::*;
pub use sites::*;
pub use suppliers::*;
