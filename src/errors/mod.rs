pub mod api;
pub use api::*;

pub mod mapping;
pub use mapping::*;

pub mod io_error;
pub use io_error::*;

pub mod portfolio_error;
pub use portfolio_error::*;
