//! Filter implementations for the criterion pipeline.
//!
//! This module contains all the concrete filter implementations
//! that can be composed into a FilterPipeline.

pub mod active_medication;
pub mod code;
pub mod temporal;
pub mod value;

// Re-export for convenience
pub use active_medication::{ActiveMedicationFilter, active_interval, filter_active};
pub use code::{CodeFilter, filter_by_code};
pub use temporal::{TemporalFilter, filter_by_date};
pub use value::{ValueFilter, filter_by_range, filter_by_value};
