pub mod classifier;
pub mod config;
pub mod cosmetic;
pub mod engine;
pub mod init;
pub mod logger;
pub mod pipeline;
pub mod service;
pub mod session;
pub mod stats;
