pub mod config;
pub mod viewer;
