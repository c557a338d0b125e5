pub mod apis;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod observability;
pub mod parser;
pub mod pipeline;
pub mod types;
