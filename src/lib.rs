pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod store;
pub mod tracing_setup;
pub mod ui;
