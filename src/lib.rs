// Library interface for dosewise modules
// This allows integration tests and the CLI to share the engine

pub mod adapter;
pub mod adjustment;
pub mod cache;
pub mod config;
pub mod conflicts;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod phase;
pub mod providers;
pub mod recommendations;
pub mod validation;
pub mod windows;

// Re-export commonly used types for convenience
pub use models::*;
pub use adapter::{AdapterConfig, DayEvaluation, DayRequest, Degradation, Fetched, SchedulingAdapter};
pub use adjustment::{AdjustmentPlanner, AnchorMode, PlannerConfig};
pub use cache::{CacheConfig, CalendarCache, PrayerKey};
pub use conflicts::{ConflictDetector, DetectorConfig};
pub use engine::{EngineConfig, MedicationAnalysis, SchedulingEngine};
pub use error::{DoseWiseError, Result, UpstreamError, ValidationError};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use phase::PhaseTracker;
pub use providers::{FestivalProvider, PrayerTimeProvider, StaticFestivalCalendar};
pub use recommendations::RecommendationGenerator;
pub use validation::{RawMedicationEntry, ScheduleValidator, ValidationReport};
pub use windows::{Blackout, WindowResolver, DEFAULT_BUFFER_MINUTES};
