//! 领域实体

mod billing;
mod master_data;
mod production;
mod quality;
mod logistics;
mod rules;
mod stock_movement;

pub use billing::{Invoice, InvoiceItem, InvoiceTotals};
pub use logistics::{DeliveryForm, ReceivingForm, Shipment};
pub use master_data::{Customer, FinishedProduct, RawMaterial, Supplier, User};
pub use production::{ProductionBatch, ProductionMaterial, ProductionStage};
pub use quality::XRayCheck;
pub use stock_movement::StockMovement;

/// 为带审计信息的实体实现 `Entity` 与 `AggregateRoot`
macro_rules! impl_aggregate {
    ($($entity:ty => $id:ty),+ $(,)?) => {
        $(
            impl foodtrace_domain_core::Entity for $entity {
                type Id = $id;

                fn id(&self) -> &Self::Id {
                    &self.id
                }
            }

            impl foodtrace_domain_core::AggregateRoot for $entity {
                fn audit_info(&self) -> &foodtrace_common::AuditInfo {
                    &self.audit_info
                }

                fn audit_info_mut(&mut self) -> &mut foodtrace_common::AuditInfo {
                    &mut self.audit_info
                }
            }
        )+
    };
}

use crate::domain::value_objects::*;

impl_aggregate!(
    Supplier => SupplierId,
    RawMaterial => RawMaterialId,
    FinishedProduct => ProductId,
    Customer => CustomerId,
    User => UserId,
    ProductionBatch => BatchId,
    ProductionStage => StageId,
    ProductionMaterial => ProductionMaterialId,
    XRayCheck => XRayCheckId,
    ReceivingForm => ReceivingFormId,
    Shipment => ShipmentId,
    DeliveryForm => DeliveryFormId,
    Invoice => InvoiceId,
    InvoiceItem => InvoiceItemId,
);
