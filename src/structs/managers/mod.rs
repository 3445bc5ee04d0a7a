pub mod transactions_manager;
pub use transactions_manager::*;

pub mod persistable;
pub use persistable::*;
