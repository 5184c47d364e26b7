// Library crate exposing modules for integration tests

pub mod config;
pub mod error;
pub mod import;
pub mod logging;
pub mod model;
pub mod repository;
pub mod util;
