pub mod config;
pub mod content_store;
pub mod domain;
pub mod frontier;
pub mod metrics;
pub mod models;
pub mod politeness;
pub mod seed;
pub mod url_norm;
pub mod visited;
pub mod worker;
