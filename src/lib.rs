//! Revenue projection and billing reports for the CollagenDirect admin
//! console.
//!
//! All money figures come from [`revenue::RevenueCalculator`]; the HTTP
//! layer in [`handlers`] only serialises what the services build.

pub mod config;
pub mod error;
pub mod format;
pub mod handlers;
pub mod logger;
pub mod models;
pub mod repository;
pub mod revenue;
pub mod services;

pub use error::{BillingError, Result};
pub use handlers::create_router;
pub use services::AppState;
