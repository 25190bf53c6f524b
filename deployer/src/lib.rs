//! bookdeploy library
//!
//! Build, push and start the Book Management Agent containers.

pub mod app;
pub mod config;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod utils;
