pub mod config;
pub mod dataset;
pub mod features;
pub mod metrics;
pub mod model;
pub mod storage;
pub mod tracking;
