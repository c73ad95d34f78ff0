//! # Party Room Reservation Service
//!
//! Booking calendar for a condominium's shared party room: residents book
//! time slots on a given day, administrators confirm, finalize and purge.
//!
//! ## Architecture
//!
//! - **domain**: reservation and user entities, booking rules, overlap
//!   detection, repository traits
//! - **application**: reservation lifecycle and identity services
//! - **infrastructure**: SeaORM persistence, in-memory store, JWT and bcrypt
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: runtime bootstrap shared by the binaries

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig, ConfigError};

// Re-export database types for easy access
pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};

// Re-export API router
pub use interfaces::http::create_api_router;
