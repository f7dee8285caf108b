//! Library crate for play-nine-back, exposing modules for binaries and tests.

/// Configuration loading.
pub mod config;
/// Stores and the local cache.
pub mod dao;
/// Request and response payloads.
pub mod dto;
/// Error types and their HTTP mapping.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Application services.
pub mod services;
/// Shared state and the game model.
pub mod state;

#[cfg(test)]
mod test_support;
