//! Plex Media Server client for the collector.

pub mod auth;
pub mod client;
pub mod config;
pub mod health;
pub mod models;

pub use client::*;
pub use config::*;
