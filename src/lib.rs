pub mod app;
pub mod chado;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod flatten;
pub mod logging;
pub mod registry;
pub mod reports;
pub mod text;
