//! DORA metrics core: period model, the four aggregators, the snapshot
//! composer and the trend engine. Everything here is pure and synchronous.

pub mod calculator;
pub mod change_failure_rate;
pub mod deployment_frequency;
pub mod lead_time;
pub mod mttr;
pub mod period;
pub mod trend;
pub mod types;

pub use calculator::{calculate, calculate_at, calculate_from, overall_rating};
pub use period::{Period, PeriodError, PeriodKind};
pub use trend::compute_trend;
pub use types::*;
