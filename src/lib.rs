pub mod app;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod history;
pub mod logging;
pub mod manifest;
pub mod period;
pub mod process;
pub mod sync;
