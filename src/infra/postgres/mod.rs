pub mod order_repo;
pub mod receipt_repo;
pub mod supply_repo;
