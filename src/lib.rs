//! Library crate for game-manager-back, exposing modules for binaries and integration tests.

/// Outbound I/O: git, processes, HTTP.
pub mod clients;
/// Runtime configuration.
pub mod config;
mod dto;
/// Setup errors and their HTTP mapping.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Setup, readiness and clock logic.
pub mod services;
/// Shared application state.
pub mod state;
