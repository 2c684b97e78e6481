pub mod aggregate;
pub mod config;
pub mod enrich;
pub mod error;
pub mod export;
pub mod http_client;
pub mod logging;
pub mod lookup;
pub mod pipeline;
pub mod predict;
pub mod roster;
pub mod summary;
