//! Data models

pub mod image;
pub mod report;
