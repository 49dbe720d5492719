// src/config.rs

use dotenvy::dotenv;
use std::{env, path::PathBuf};

/// Where finished sessions are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderSink {
    /// `session_records` table in the main database.
    Remote,
    /// JSON files under `local_store_dir`.
    Local,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    pub recorder: RecorderSink,
    pub local_store_dir: PathBuf,
    pub log_dir: String,
    /// Live runs untouched for this many seconds are dropped.
    pub run_idle_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://brightsteps.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60 * 60 * 24);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let recorder = match env::var("RECORDER").as_deref() {
            Ok("local") => RecorderSink::Local,
            _ => RecorderSink::Remote,
        };

        let local_store_dir = env::var("LOCAL_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("sessions"));

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        let run_idle_secs = env::var("RUN_IDLE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30 * 60);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            recorder,
            local_store_dir,
            log_dir,
            run_idle_secs,
        }
    }
}
