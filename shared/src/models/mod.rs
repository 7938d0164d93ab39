//! Domain models for the Site Inventory Ledger

mod movement;
mod product;
mod shopping_list;
mod site;
mod supplier;

pub use movement::*;
pub use product::*;
pub use shopping_list::*;
pub use site::*;
pub use supplier::*;
