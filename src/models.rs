//! Data models for products, raw materials and cost computations
//!
//! Field names on the wire follow the backend's JSON (and the layout of the
//! saved query history), so the serde renames here are load-bearing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A raw material as used by one product (one bill-of-materials row)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMaterialUsage {
    /// Id of the product/material link row, when the backend sends it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "materia_prima_id")]
    pub material_id: Option<i64>,
    #[serde(rename = "descricao_produto")]
    pub name: String,
    #[serde(rename = "quantidade_utilizada", deserialize_with = "null_as_zero")]
    pub quantity_used_per_unit: f64,
    #[serde(rename = "unidade_medida_padrao")]
    pub standard_unit: Option<String>,
    /// Cost per standard unit. `None` means unmapped, not free.
    #[serde(rename = "valor_unitario")]
    pub unit_cost: Option<f64>,
}

impl RawMaterialUsage {
    pub fn is_mapped(&self) -> bool {
        self.unit_cost.is_some()
    }
}

/// A registered product
///
/// Deserializes from both the list endpoint (`ID_Produto`, `Produto`,
/// `Total_Produto`) and the detail endpoint (`id`, `nome_produto`,
/// `total_custo`, `materias_primas`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    #[serde(alias = "ID_Produto")]
    pub id: i64,
    #[serde(alias = "Produto", alias = "nome_produto")]
    pub name: String,
    #[serde(alias = "materias_primas")]
    pub raw_materials: Vec<RawMaterialUsage>,
    /// Precomputed per-unit cost as reported by the backend
    #[serde(alias = "Total_Produto", alias = "total_custo")]
    pub total_cost: Option<f64>,
    /// Sum of material quantities, only present on the list endpoint
    #[serde(alias = "Quantidades_MP", skip_serializing_if = "Option::is_none")]
    pub material_quantity: Option<f64>,
}

impl Product {
    pub fn reference(&self) -> ProductRef {
        ProductRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Catalog entry from `/materias-primas`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMaterial {
    pub id: i64,
    #[serde(rename = "descricao_produto")]
    pub name: String,
    #[serde(rename = "codigo_produto")]
    pub product_code: Option<String>,
    #[serde(rename = "data_emissao_nota")]
    pub issue_date: Option<String>,
    #[serde(rename = "unidade_medida_nf")]
    pub invoice_unit: Option<String>,
    #[serde(rename = "valor_unitario_nf")]
    pub invoice_unit_price: Option<f64>,
    #[serde(rename = "peso_bruto")]
    pub gross_weight: Option<f64>,
    #[serde(rename = "unidade_medida_padrao")]
    pub standard_unit: Option<String>,
    #[serde(rename = "custo_por_unidade_padrao")]
    pub standard_unit_cost: Option<f64>,
}

impl RawMaterial {
    pub fn is_mapped(&self) -> bool {
        self.standard_unit_cost.is_some()
    }
}

/// Identity of the product a computation was made for
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductRef {
    pub id: i64,
    pub name: String,
}

/// One costed row of a computation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(flatten)]
    pub material: RawMaterialUsage,
    #[serde(rename = "quantidadeTotalMP", default, deserialize_with = "null_as_zero")]
    pub total_quantity: f64,
    #[serde(rename = "subTotalMP", default, deserialize_with = "null_as_zero")]
    pub subtotal: f64,
}

/// Result of costing a bill of materials for a produced quantity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CostComputation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductRef>,
    #[serde(rename = "quantidadeProduzida", deserialize_with = "null_as_zero")]
    pub produced_quantity: f64,
    #[serde(rename = "rawMaterials")]
    pub line_items: Vec<LineItem>,
    #[serde(rename = "totalCusto", deserialize_with = "null_as_zero")]
    pub total_cost: f64,
}

/// A saved cost query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(rename = "dataConsulta")]
    pub queried_at: DateTime<Utc>,
    #[serde(rename = "nomeProduto")]
    pub product_name: String,
    #[serde(rename = "qtdProduzida", deserialize_with = "null_as_zero")]
    pub produced_quantity: f64,
    #[serde(rename = "custoTotal", deserialize_with = "null_as_zero")]
    pub total_cost: f64,
    #[serde(rename = "detalhes")]
    pub detail: CostComputation,
}

/// `null` numbers (a NaN written through JSON) read as 0
fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}
