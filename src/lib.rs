//! Browser-driven property listing scraper.
//!
//! A run walks the search result pages, collects property detail links,
//! extracts each property into a fixed set of fields, and always finishes by
//! writing whatever it collected.

pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod scrapers;
pub mod session;

pub use error::{Result, ScrapeError};
pub use models::{Field, PropertyRecord, SENTINEL};
pub use session::{Interrupt, Orchestrator, RunOutcome, RunSummary};
