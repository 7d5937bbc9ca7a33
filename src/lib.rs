//! ad-gate — submission moderation gate for a broadcast channel.

pub mod config;
pub mod error;
pub mod gateway;
pub mod moderation;
