pub mod balance_report;
pub use balance_report::*;

pub mod history;
pub use history::*;
