//! Common utilities and shared types for warden.
//!
//! This crate provides foundational components used across all warden crates:
//!
//! - **Configuration**: Application and per-community enforcement settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Telemetry**: `tracing` subscriber setup via [`init_tracing`]
//!
//! # Example
//!
//! ```no_run
//! use warden_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let settings = config.moderation.community("guild-1")?;
//!     println!("timeout threshold: {}", settings.thresholds.timeout_threshold);
//!     let id = IdGenerator::new().generate();
//!     println!("Generated ID: {id}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod telemetry;

pub use config::{
    CommunityConfig, CommunitySettings, Config, ConsistencyMode, DatabaseConfig,
    EnforcementThresholds, MAX_DECAY_AMOUNT, MAX_TIMEOUT_HOURS, MAX_WINDOW_DAYS, ModerationConfig,
    SeverityWeights,
};
pub use error::{AppError, AppResult, FaultKind};
pub use id::IdGenerator;
pub use telemetry::init_tracing;
