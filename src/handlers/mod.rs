// src/handlers/mod.rs

pub mod activities;
pub mod auth;
pub mod runs;
pub mod sessions;
