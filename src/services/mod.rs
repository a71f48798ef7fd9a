pub mod coordinator;
pub mod pipeline;
pub mod renewal;
