pub mod cli;
pub mod config;
pub mod metadata;
pub mod runtime;
