pub mod api;
pub mod config;
pub mod errors;
pub mod functions;
pub mod logger;
pub mod parsing;
pub mod structs;
pub mod utils;
