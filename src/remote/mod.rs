//! Remote object-store daemon backend
//!
//! Maps the storage contract onto an external daemon's HTTP API.

#[cfg(feature = "remote")]
mod client;
mod config;
#[cfg(feature = "remote")]
mod wire;

#[cfg(feature = "remote")]
pub use client::RemoteStore;
pub use config::{parse_api_addr, Auth, RemoteConfig, DEFAULT_API_ADDR};
