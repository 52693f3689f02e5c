//! Core client, dispatch and aggregation module

pub mod aggregate;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod models;
