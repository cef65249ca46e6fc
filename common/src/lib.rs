// Common library shared by the API server and integration tests

pub mod bootstrap;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod models;
pub mod pagination;
pub mod retry;
pub mod storage;
pub mod telemetry;
pub mod transport;
pub mod vertex;
