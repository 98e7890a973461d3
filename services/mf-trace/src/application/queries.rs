//! 查询视图

use foodtrace_domain_core::Quantity;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::{
    Customer, DeliveryForm, FinishedProduct, Invoice, InvoiceTotals, ProductionBatch,
    ProductionMaterial, ProductionStage, RawMaterial, ReceivingForm, Shipment, Supplier, User,
    XRayCheck,
};
use crate::domain::enums::StockItemKind;

/// 低库存条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowStockItem {
    pub kind: StockItemKind,
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub unit: String,
    pub quantity_in_stock: Quantity,
    pub reorder_level: Quantity,
}

impl LowStockItem {
    pub fn from_raw_material(m: &RawMaterial) -> Self {
        Self {
            kind: StockItemKind::RawMaterial,
            id: m.id.0,
            code: m.code.clone(),
            name: m.name.clone(),
            unit: m.unit.clone(),
            quantity_in_stock: m.quantity_in_stock,
            reorder_level: m.reorder_level,
        }
    }

    pub fn from_product(p: &FinishedProduct, reorder_level: Quantity) -> Self {
        Self {
            kind: StockItemKind::FinishedProduct,
            id: p.id.0,
            code: p.sku.clone(),
            name: p.name.clone(),
            unit: p.unit.clone(),
            quantity_in_stock: p.quantity_in_stock,
            reorder_level,
        }
    }
}

/// 发票及汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    #[serde(flatten)]
    pub totals: InvoiceTotals,
}

impl From<Invoice> for InvoiceView {
    fn from(invoice: Invoice) -> Self {
        let totals = invoice.totals();
        Self { invoice, totals }
    }
}

/// 收货记录及其供应商
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceivingTrace {
    pub form: ReceivingForm,
    pub supplier: Option<Supplier>,
}

/// 投料及其原材料来源
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialTrace {
    pub usage: ProductionMaterial,
    pub raw_material: Option<RawMaterial>,
    /// 同一原材料、同一批号的收货单
    pub receipts: Vec<ReceivingTrace>,
}

/// 发货记录及其客户、签收
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentTrace {
    pub shipment: Shipment,
    pub customer: Option<Customer>,
    pub delivery: Option<DeliveryForm>,
}

/// 批次正反向追溯
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchTrace {
    pub batch: ProductionBatch,
    pub product: Option<FinishedProduct>,
    pub supervisor: Option<User>,
    pub stages: Vec<ProductionStage>,
    pub materials: Vec<MaterialTrace>,
    pub xray_checks: Vec<XRayCheck>,
    pub shipments: Vec<ShipmentTrace>,
}

/// 原材料批号召回视图
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LotTrace {
    pub raw_material: RawMaterial,
    pub lot_number: String,
    pub receipts: Vec<ReceivingTrace>,
    pub batches: Vec<ProductionBatch>,
    pub shipments: Vec<Shipment>,
    /// 受影响客户（去重）
    pub customers: Vec<Customer>,
}
