pub mod client;
pub mod config;
pub mod models;
pub mod provider;
pub mod token;
