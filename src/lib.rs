pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod models;
pub mod observability;
pub mod registry;
pub mod state;
