//! Command implementations.

pub mod config;
pub mod endpoint;
pub mod models;
pub mod refine;
pub mod request;
pub mod search;

mod setup;
