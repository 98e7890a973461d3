//! 主数据命令

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::enums::UserRole;
use crate::domain::value_objects::SupplierId;

/// 供应商输入
#[derive(Debug, Clone, Deserialize)]
pub struct SupplierInput {
    pub code: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub is_approved: bool,
}

/// 原材料输入
#[derive(Debug, Clone, Deserialize)]
pub struct RawMaterialInput {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub supplier_id: Option<SupplierId>,
    pub unit: String,
    #[serde(default)]
    pub reorder_level: Decimal,
    #[serde(default)]
    pub unit_cost: Decimal,
    pub allergens: Option<String>,
    pub storage_conditions: Option<String>,
    /// 期初库存，仅新建时生效，记为一笔手工调整
    pub opening_stock: Option<Decimal>,
}

/// 成品输入
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    #[serde(default)]
    pub unit_price: Decimal,
    pub shelf_life_days: Option<i32>,
    /// 期初库存，仅新建时生效
    pub opening_stock: Option<Decimal>,
}

/// 客户输入
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerInput {
    pub code: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// 用户输入
#[derive(Debug, Clone, Deserialize)]
pub struct UserInput {
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: UserRole,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

pub(crate) fn default_true() -> bool {
    true
}
