// Shared library for the C2 broadcaster: configuration, transport and the scheduling engine

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod models;
pub mod scheduler;
pub mod telemetry;
pub mod transport;
