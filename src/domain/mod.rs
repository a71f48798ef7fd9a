pub mod error;
pub mod money;
pub mod notify;
pub mod order;
pub mod receipt;
pub mod transaction;
