// Module structure for the logmetric agent.

// Core infrastructure
pub mod conf;
pub mod filter;
pub mod metrics;
pub mod sample_log;

// Domain modules
pub mod strategy;
pub mod worker;
pub mod service;
pub mod runtime;
