/// Checkout rewriting between sync and launch.
pub mod checkout_prep;
/// Countdown and in-game timer streams.
pub mod clock_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Strategies that start the game process.
pub mod launcher;
/// Readiness gate driver polling the game's health endpoint.
pub mod readiness;
/// End-to-end "set up a new game" orchestration.
pub mod setup_service;
