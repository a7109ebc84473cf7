pub mod command;
pub mod config;
pub mod device;
pub mod drive;
pub mod engine;
pub mod queue;
pub mod sector;
pub mod sink;
pub mod status;
