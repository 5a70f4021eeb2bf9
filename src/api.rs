//! Client for the product/material catalog backend
//!
//! Blocking calls against three GET endpoints. Any transport error, non-2xx
//! status or undecodable body is a `FetchFailure`; nothing is retried.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::{CostError, Result};
use crate::models::{Product, RawMaterial};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

pub struct CatalogClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl CatalogClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CostError::fetch("client", e))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /produtos-cadastrados`
    pub fn list_products(&self) -> Result<Vec<Product>> {
        self.get("/produtos-cadastrados")
    }

    /// `GET /produtos-cadastrados/{id}`, including the bill of materials
    pub fn get_product(&self, id: i64) -> Result<Product> {
        self.get(&format!("/produtos-cadastrados/{}", id))
    }

    /// `GET /materias-primas`
    pub fn list_materials(&self) -> Result<Vec<RawMaterial>> {
        self.get("/materias-primas")
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        info!(%url, "fetching");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| CostError::fetch(path, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CostError::fetch(path, format!("server returned {}", status)));
        }

        response.json().map_err(|e| CostError::fetch(path, e))
    }
}
