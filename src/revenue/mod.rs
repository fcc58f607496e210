pub mod aggregate;
pub mod calculator;
pub mod frequency;

pub use aggregate::{top_breakdown, BreakdownEntry, RevenueTotals};
pub use calculator::{
    unit_schedule, DataWarning, OrderProjection, PrescriptionTerms, PriceSource, RevenueCalculator,
    UnitSchedule,
};
pub use frequency::{patches_per_week, resolve_frequency, FrequencyReading};
