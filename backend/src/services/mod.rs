//! Business logic services for the Site Inventory Ledger

pub mod catalog;
pub mod ledger;
pub mod shopping_list;
pub mod stock;

pub use catalog::CatalogService;
pub use ledger::LedgerService;
pub use shopping_list::ShoppingListService;
pub use stock::StockService;
