// Core engine services
pub mod batches;
pub mod movements;
pub mod transfers;
