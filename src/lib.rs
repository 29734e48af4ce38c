//! Chirpy Auth - authentication and session core for the Chirpy API
//!
//! # Modules
//!
//! - [`core_types`] - `Principal` (user identity)
//! - [`clock`] - Injectable wall clock
//! - [`auth`] - Password hashing, access/refresh tokens, header extraction, sessions
//! - [`db`] - PostgreSQL user directory and refresh token store
//! - [`gateway`] - axum HTTP routes over the session service
//! - [`config`] - YAML + environment configuration
//! - [`logging`] - tracing subscriber setup

// Core types - must be first!
pub mod core_types;

pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;

// Convenient re-exports at crate root
pub use auth::{
    AccessTokenCodec, AuthError, CredentialHasher, MemoryRefreshStore, MemoryUserDirectory,
    PasswordParams, RefreshTokenStore, SessionConfig, SessionService, UserDirectory,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use core_types::Principal;
