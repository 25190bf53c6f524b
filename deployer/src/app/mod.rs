//! Application entry points

pub mod cli;
pub mod run;
