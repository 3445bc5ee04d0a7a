pub mod coin;
pub use coin::*;

pub mod transaction;
pub use transaction::*;

pub mod wallet;
pub use wallet::*;

pub mod portfolio;
pub use portfolio::*;

pub mod exchange;
pub use exchange::*;

pub mod tables;
pub use tables::*;

pub mod snapshot;
pub use snapshot::*;

pub mod managers;
pub use managers::*;
