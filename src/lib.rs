//! FitLog Analytics - progress analytics and projection engine
//!
//! Turns a snapshot of body measurements, meal logs, a profile and a goal into
//! a deterministic view model: boundary normalization → derived metrics →
//! check-in streaks → goal progress and projection → nutrition rollups.
//!
//! Every calculator is a pure function of its inputs. The current date is
//! always supplied by the caller; nothing in the library reads a clock.
//!
//! ## Modules
//!
//! - **Boundary**: `schema` normalizes raw collaborator records via alias tables
//! - **Calculators**: `metrics`, `streak`, `goal`, `nutrition`
//! - **Composition**: `facade` runs one analytics pass; `ffi` exposes it to C hosts

pub mod config;
pub mod error;
pub mod facade;
pub mod goal;
pub mod logging;
pub mod metrics;
pub mod nutrition;
pub mod schema;
pub mod store;
pub mod streak;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use error::{EngineError, ValidationError};
pub use facade::{analytics_from_json, AnalyticsFacade, AnalyticsInput, AnalyticsReport, AnalyticsView};
pub use goal::GoalProjector;
pub use metrics::DerivedMetrics;
pub use nutrition::{NutritionAggregator, PendingMeal};
pub use store::MeasurementStore;
pub use streak::StreakCalculator;

// Schema exports
pub use schema::{RawSnapshot, RecordAdapter, SNAPSHOT_SCHEMA};

/// Library version reported by the CLI and FFI
pub const FITLOG_VERSION: &str = env!("CARGO_PKG_VERSION");
