//! Process bootstrap helpers: configuration loading, logging and service wiring.

pub mod bootstrap;
pub mod config;
pub mod logger;
