pub mod config;
pub mod error;
pub mod export;
pub mod registry;
pub mod server;
pub mod source;
pub mod value;
