pub mod mapping;
pub use mapping::*;

pub mod services;
pub use services::*;
