pub mod controller;
pub mod cooldown;
pub mod error;
pub mod keys;
pub mod logger;
pub mod monitor;
pub mod platform;
pub mod sensing;
pub mod settings;
pub mod sleep;
pub mod targeting;
pub mod types;
