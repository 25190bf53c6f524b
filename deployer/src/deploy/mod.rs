//! Deployment module

pub mod compose;
pub mod docker;
pub mod ecr;
pub mod engine;
pub mod executor;
pub mod fsm;
pub mod pipeline;
pub mod plan;
pub mod readiness;
pub mod runner;
