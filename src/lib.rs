// src/lib.rs

pub mod activities;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod runtime;
pub mod scoring;
pub mod state;
pub mod stats;
pub mod store;
pub mod utils;

pub use routes::create_router;
