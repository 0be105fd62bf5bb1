pub mod bootstrap;
pub mod config;
pub mod dataset;
pub mod handler;
pub mod sessions;
