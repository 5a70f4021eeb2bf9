//! Production cost calculator
//!
//! Costs a product's bill of materials for a produced quantity, derives
//! dashboard metrics, keeps a local history of saved queries and exports
//! results as spreadsheets or PDF reports.

pub mod aggregate;
pub mod api;
pub mod calculator;
pub mod db;
pub mod error;
pub mod export;
pub mod history;
pub mod logging;
pub mod models;
pub mod session;

pub use error::{CostError, Result};
