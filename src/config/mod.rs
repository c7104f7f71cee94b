//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply environment overrides)
//!     → [CLI flags applied in main.rs]
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared by clone to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AppConfig;
pub use schema::CorsConfig;
pub use schema::HttpConfig;
pub use schema::ListenerConfig;
pub use schema::TransportMode;
