//! Configuration management for the CTF platform
//!
//! This crate provides centralized configuration loading and management
//! for different environments (development, production, etc.).

pub mod environment;
pub mod loader;
pub mod types;

pub use environment::Environment;
pub use loader::load_config;
pub use types::*;
