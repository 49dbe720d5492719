// src/models/mod.rs

pub mod run;
pub mod session_record;
pub mod user;
