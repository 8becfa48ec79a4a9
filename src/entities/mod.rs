pub mod inventory_account;
pub mod product;
pub mod stock_movement;
pub mod stock_transfer;
