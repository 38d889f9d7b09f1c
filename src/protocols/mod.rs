pub mod aave;
pub mod compound;
pub mod lending;

pub use lending::{LendingDirection, LendingOrchestrator, LendingReceipt};
