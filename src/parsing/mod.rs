pub mod exchange_files;
pub use exchange_files::*;
