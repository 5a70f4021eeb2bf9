//! State of one costing session: selected product, quantity, last result

use chrono::{DateTime, NaiveDate, Utc};

use crate::calculator;
use crate::error::{CostError, Result};
use crate::export;
use crate::history::HistoryStore;
use crate::models::{CostComputation, HistoryEntry, Product};

#[derive(Debug, Default)]
pub struct CostSession {
    product: Option<Product>,
    produced_quantity: Option<f64>,
    computation: Option<CostComputation>,
}

impl CostSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a product; any previous quantity and result are discarded
    pub fn select_product(&mut self, product: Product) {
        self.product = Some(product);
        self.produced_quantity = None;
        self.computation = None;
    }

    pub fn product(&self) -> Option<&Product> {
        self.product.as_ref()
    }

    pub fn computation(&self) -> Option<&CostComputation> {
        self.computation.as_ref()
    }

    /// Validate the entered quantity and cost the selected product
    ///
    /// On failure the previous result is left untouched.
    pub fn calculate(&mut self, quantity_input: &str) -> Result<&CostComputation> {
        let product = self.product.as_ref().ok_or(CostError::NoProductSelected)?;
        let quantity = calculator::parse_quantity(quantity_input)?;
        let computation = calculator::compute_product_cost(product, quantity)?;

        self.produced_quantity = Some(quantity);
        Ok(&*self.computation.insert(computation))
    }

    fn current(&self) -> Option<(&Product, f64, &CostComputation)> {
        match (&self.product, self.produced_quantity, &self.computation) {
            (Some(product), Some(quantity), Some(computation)) => Some((product, quantity, computation)),
            _ => None,
        }
    }

    /// Save the last result to the history
    pub fn save_query(&self, store: &HistoryStore, now: DateTime<Utc>) -> Result<HistoryEntry> {
        let (product, quantity, computation) = self.current().ok_or(CostError::NothingToSave)?;
        store.save(computation, &product.name, quantity, now)
    }

    /// File name and `.xlsx` bytes for the last result
    pub fn export_spreadsheet(&self, export_date: NaiveDate) -> Result<(String, Vec<u8>)> {
        let (product, quantity, computation) = self.current().ok_or(CostError::NothingToExport)?;
        let bytes = export::to_spreadsheet(computation, &product.name, quantity, export_date)?;
        Ok((export::export_file_name(&product.name, "xlsx"), bytes))
    }

    /// File name and PDF bytes for the last result
    pub fn export_pdf(&self, export_date: NaiveDate) -> Result<(String, Vec<u8>)> {
        let (product, quantity, computation) = self.current().ok_or(CostError::NothingToExport)?;
        let bytes = export::to_pdf(computation, &product.name, quantity, export_date)?;
        Ok((export::export_file_name(&product.name, "pdf"), bytes))
    }
}
