pub mod audit;
pub mod config;
pub mod persistence;
pub mod pipeline;
pub mod transport;
