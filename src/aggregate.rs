//! Dashboard metrics derived from the product and material catalogs

use crate::models::{Product, RawMaterial};

/// Share of one product in the summed product cost
#[derive(Debug, Clone, PartialEq)]
pub struct ProductShare {
    pub product_id: i64,
    pub name: String,
    pub cost: f64,
    pub percentage: f64,
}

/// Summary figures shown on the dashboard
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardSummary {
    pub sum_of_product_costs: f64,
    pub average_product_cost: f64,
    pub product_count: usize,
    pub material_count: usize,
    pub unmapped_material_count: usize,
    pub shares: Vec<ProductShare>,
}

/// Product cost as used by aggregation; a missing total counts as zero
fn product_cost(product: &Product) -> f64 {
    product.total_cost.unwrap_or(0.0)
}

/// Summarize products and materials. Empty inputs give a zeroed summary.
pub fn summarize(products: &[Product], materials: &[RawMaterial]) -> DashboardSummary {
    let sum_of_product_costs = products.iter().fold(0.0, |acc, p| acc + product_cost(p));
    let product_count = products.len();

    let average_product_cost = if product_count > 0 {
        sum_of_product_costs / product_count as f64
    } else {
        0.0
    };

    let shares = products
        .iter()
        .map(|p| ProductShare {
            product_id: p.id,
            name: p.name.clone(),
            cost: product_cost(p),
            percentage: percentage_share(product_cost(p), sum_of_product_costs),
        })
        .collect();

    DashboardSummary {
        sum_of_product_costs,
        average_product_cost,
        product_count,
        material_count: materials.len(),
        unmapped_material_count: unmapped_count(materials),
        shares,
    }
}

/// Percentage of `cost` in `total`, 0 when the total is not positive
pub fn percentage_share(cost: f64, total: f64) -> f64 {
    if total > 0.0 { cost / total * 100.0 } else { 0.0 }
}

/// (product name, cost) pairs in catalog order, for the cost-per-product chart
pub fn cost_series(products: &[Product]) -> Vec<(String, f64)> {
    products
        .iter()
        .map(|p| (p.name.clone(), product_cost(p)))
        .collect()
}

/// Number of catalog materials that still lack a standard-unit cost
pub fn unmapped_count(materials: &[RawMaterial]) -> usize {
    materials.iter().filter(|m| !m.is_mapped()).count()
}

impl std::fmt::Display for DashboardSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dashboard ===")?;
        writeln!(f, "Total product cost:   {:.2}", self.sum_of_product_costs)?;
        writeln!(f, "Products registered:  {}", self.product_count)?;
        writeln!(f, "Average product cost: {:.2}", self.average_product_cost)?;
        writeln!(
            f,
            "Raw materials:        {} ({} unmapped)",
            self.material_count, self.unmapped_material_count
        )?;

        if !self.shares.is_empty() {
            writeln!(f)?;
            writeln!(f, "Cost share by product:")?;
            for share in &self.shares {
                writeln!(
                    f,
                    "  {:<30} {:>12.2} {:>6.1}%",
                    share.name, share.cost, share.percentage
                )?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, name: &str, cost: Option<f64>) -> Product {
        Product {
            id,
            name: name.to_string(),
            total_cost: cost,
            ..Default::default()
        }
    }

    #[test]
    fn empty_inputs_give_zeroed_summary() {
        let summary = summarize(&[], &[]);
        assert_eq!(summary.sum_of_product_costs, 0.0);
        assert_eq!(summary.average_product_cost, 0.0);
        assert!(!summary.average_product_cost.is_nan());
        assert_eq!(summary.product_count, 0);
        assert_eq!(summary.material_count, 0);
        assert!(summary.shares.is_empty());
        assert!(!summary.sum_of_product_costs.is_sign_negative());
        assert!(!summary.to_string().contains("-0.00"));
    }

    #[test]
    fn totals_and_average() {
        let products = vec![product(1, "A", Some(10.0)), product(2, "B", Some(30.0)), product(3, "C", None)];
        let materials = vec![
            RawMaterial { id: 1, standard_unit_cost: Some(2.0), ..Default::default() },
            RawMaterial { id: 2, ..Default::default() },
        ];
        let summary = summarize(&products, &materials);

        assert_eq!(summary.sum_of_product_costs, 40.0);
        assert!((summary.average_product_cost - 40.0 / 3.0).abs() < 1e-12);
        assert_eq!(summary.product_count, 3);
        assert_eq!(summary.material_count, 2);
        assert_eq!(summary.unmapped_material_count, 1);
    }

    #[test]
    fn shares_sum_to_one_hundred() {
        let products = vec![
            product(1, "A", Some(0.1)),
            product(2, "B", Some(3.3)),
            product(3, "C", Some(17.77)),
            product(4, "D", Some(1234.5)),
        ];
        let summary = summarize(&products, &[]);
        let total: f64 = summary.shares.iter().map(|s| s.percentage).sum();
        assert!((total - 100.0).abs() < 1e-6);
    }

    #[test]
    fn shares_are_zero_when_costs_sum_to_zero() {
        let products = vec![product(1, "A", Some(0.0)), product(2, "B", None)];
        let summary = summarize(&products, &[]);
        assert!(summary.shares.iter().all(|s| s.percentage == 0.0));
    }

    #[test]
    fn cost_series_keeps_catalog_order() {
        let products = vec![product(2, "B", Some(3.0)), product(1, "A", None)];
        assert_eq!(
            cost_series(&products),
            vec![("B".to_string(), 3.0), ("A".to_string(), 0.0)]
        );
    }
}
