pub mod files;
pub use files::*;

pub mod time;
pub use time::*;

pub mod numbers;
pub use numbers::*;
