pub mod inventory;
pub mod transfers;

pub use inventory::InventoryService;
pub use transfers::TransferService;
