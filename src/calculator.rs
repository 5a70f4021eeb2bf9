//! Bill-of-materials cost calculator

use tracing::debug;

use crate::error::{CostError, Result};
use crate::models::{CostComputation, LineItem, Product, RawMaterialUsage};

/// Calculate line-item and total costs for a produced quantity
///
/// Each line keeps its input position. Unmapped materials (no unit cost)
/// stay in the output with `unit_cost = None` and contribute 0 to the total.
pub fn compute_cost(raw_materials: &[RawMaterialUsage], produced_quantity: f64) -> Result<CostComputation> {
    if !produced_quantity.is_finite() || produced_quantity <= 0.0 {
        return Err(CostError::InvalidQuantity(produced_quantity.to_string()));
    }

    let line_items: Vec<LineItem> = raw_materials
        .iter()
        .map(|material| {
            let total_quantity = material.quantity_used_per_unit * produced_quantity;
            LineItem {
                material: material.clone(),
                total_quantity,
                subtotal: total_quantity * material.unit_cost.unwrap_or(0.0),
            }
        })
        .collect();

    let total_cost = line_items.iter().fold(0.0, |acc, item| acc + item.subtotal);

    debug!(
        lines = line_items.len(),
        produced_quantity, total_cost, "computed bill-of-materials cost"
    );

    Ok(CostComputation {
        product: None,
        produced_quantity,
        line_items,
        total_cost,
    })
}

/// Same as [`compute_cost`], tagging the result with the product it belongs to
pub fn compute_product_cost(product: &Product, produced_quantity: f64) -> Result<CostComputation> {
    let mut computation = compute_cost(&product.raw_materials, produced_quantity)?;
    computation.product = Some(product.reference());
    Ok(computation)
}

/// Parse a user-entered produced quantity
///
/// Only whole, positive quantities are accepted.
pub fn parse_quantity(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    match trimmed.parse::<u32>() {
        Ok(0) | Err(_) => Err(CostError::InvalidQuantity(trimmed.to_string())),
        Ok(quantity) => Ok(f64::from(quantity)),
    }
}

/// Cost of producing a single unit
pub fn bill_of_materials_cost(raw_materials: &[RawMaterialUsage]) -> f64 {
    raw_materials
        .iter()
        .fold(0.0, |acc, m| acc + m.quantity_used_per_unit * m.unit_cost.unwrap_or(0.0))
}

/// Batch cost divided by the produced quantity
pub fn unit_cost(computation: &CostComputation) -> f64 {
    if computation.produced_quantity > 0.0 {
        computation.total_cost / computation.produced_quantity
    } else {
        0.0
    }
}

/// Line items whose material has no standard-unit cost yet
pub fn unmapped_materials(computation: &CostComputation) -> Vec<&LineItem> {
    computation
        .line_items
        .iter()
        .filter(|item| !item.material.is_mapped())
        .collect()
}

/// Derive the cost per standard unit from the latest invoice price
///
/// `UN`, `MT` and `KG` are priced directly from the invoice. `LT` needs a
/// positive gross weight to convert. Anything else is unmapped.
pub fn standard_unit_cost(
    standard_unit: Option<&str>,
    invoice_unit_price: Option<f64>,
    gross_weight: Option<f64>,
) -> Option<f64> {
    let price = invoice_unit_price?;
    match standard_unit? {
        "UN" | "MT" | "KG" => Some(price),
        "LT" => match gross_weight {
            Some(weight) if weight > 0.0 => Some(price / weight),
            _ => None,
        },
        _ => None,
    }
}

/// Format a computation as a readable table
pub fn format_computation(computation: &CostComputation) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<30} {:>12} {:<6} {:>14} {:>14}\n",
        "Material", "Total qty", "Unit", "Unit cost", "Subtotal"
    ));
    output.push_str(&format!("{}\n", "-".repeat(80)));

    for item in &computation.line_items {
        let unit_cost = match item.material.unit_cost {
            Some(cost) => format!("{:.2}", cost),
            None => "unmapped".to_string(),
        };
        output.push_str(&format!(
            "{:<30} {:>12.2} {:<6} {:>14} {:>14.2}\n",
            item.material.name,
            item.total_quantity,
            item.material.standard_unit.as_deref().unwrap_or("-"),
            unit_cost,
            item.subtotal
        ));
    }

    output
}

/// Summary of a cost computation
#[derive(Debug)]
pub struct CostSummary {
    pub product_name: String,
    pub produced_quantity: f64,
    pub total_cost: f64,
    pub unit_cost: f64,
    pub unmapped: Vec<String>,
}

/// Generate a summary of the computation
pub fn summarize_computation(computation: &CostComputation, product_name: &str) -> CostSummary {
    CostSummary {
        product_name: product_name.to_string(),
        produced_quantity: computation.produced_quantity,
        total_cost: computation.total_cost,
        unit_cost: unit_cost(computation),
        unmapped: unmapped_materials(computation)
            .into_iter()
            .map(|item| item.material.name.clone())
            .collect(),
    }
}

impl std::fmt::Display for CostSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Production Cost ===")?;
        writeln!(f, "Product:  {}", self.product_name)?;
        writeln!(f, "Quantity: {}", self.produced_quantity)?;
        writeln!(f)?;
        writeln!(f, "Batch cost:    {:.2}", self.total_cost)?;
        writeln!(f, "Cost per unit: {:.2}", self.unit_cost)?;

        if !self.unmapped.is_empty() {
            writeln!(f)?;
            writeln!(f, "Unmapped materials (counted as zero):")?;
            for name in &self.unmapped {
                writeln!(f, "  {}", name)?;
            }
        }

        Ok(())
    }
}
