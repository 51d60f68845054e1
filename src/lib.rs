pub mod adapter;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod football_data;
pub mod http_client;
pub mod identity;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod queries;
pub mod season;
pub mod sportsdb;
pub mod status;
pub mod store;
pub mod upsert;
