pub mod cache;
pub mod compactor;
pub mod config;
pub mod engine;
pub mod gateway;
pub mod limits;
pub mod model;
pub mod observability;
pub mod status;
pub mod wal;
