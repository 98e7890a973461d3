//! 追溯查询：批次正反向追溯与原材料批号召回

use std::collections::{HashMap, HashSet};

use foodtrace_errors::{AppError, AppResult};
use tracing::info;

use super::production::load_batch;
use super::{ServiceHandler, found};
use crate::application::queries::{BatchTrace, LotTrace, MaterialTrace, ReceivingTrace, ShipmentTrace};
use crate::domain::UnitOfWork;
use crate::domain::entities::{ReceivingForm, Supplier};
use crate::domain::value_objects::{BatchId, CustomerId, RawMaterialId, SupplierId};

/// 为收货单补上供应商，同一供应商只查一次
async fn with_suppliers(
    uow: &dyn UnitOfWork,
    forms: Vec<ReceivingForm>,
    cache: &mut HashMap<SupplierId, Option<Supplier>>,
) -> AppResult<Vec<ReceivingTrace>> {
    let mut traces = Vec::with_capacity(forms.len());
    for form in forms {
        let supplier = match cache.get(&form.supplier_id) {
            Some(s) => s.clone(),
            None => {
                let s = uow.suppliers().find_by_id(&form.supplier_id).await?;
                cache.insert(form.supplier_id, s.clone());
                s
            }
        };
        traces.push(ReceivingTrace { form, supplier });
    }
    Ok(traces)
}

impl ServiceHandler {
    /// 批次追溯：向上到原材料收货与供应商，向下到发货与客户
    pub async fn trace_batch(&self, id: &BatchId) -> AppResult<BatchTrace> {
        let uow = self.uow_factory.read().await?;
        let uow = uow.as_ref();
        let batch = load_batch(uow, id).await?;

        let product = uow.products().find_by_id(&batch.product_id).await?;
        let supervisor = match &batch.supervisor_id {
            Some(user_id) => uow.users().find_by_id(user_id).await?,
            None => None,
        };
        let stages = uow.stages().list_by_batch(id).await?;
        let xray_checks = uow.xray_checks().list_by_batch(id).await?;

        let mut suppliers = HashMap::new();
        let mut materials = Vec::new();
        for usage in uow.production_materials().list_by_batch(id).await? {
            let raw_material = uow.raw_materials().find_by_id(&usage.raw_material_id).await?;
            let receipts = match &usage.lot_number {
                Some(lot) => {
                    let forms = uow
                        .receiving_forms()
                        .list_by_lot(&usage.raw_material_id, lot)
                        .await?;
                    with_suppliers(uow, forms, &mut suppliers).await?
                }
                None => Vec::new(),
            };
            materials.push(MaterialTrace {
                usage,
                raw_material,
                receipts,
            });
        }

        let mut shipments = Vec::new();
        for shipment in uow.shipments().list_by_batch(id).await? {
            let customer = uow.customers().find_by_id(&shipment.customer_id).await?;
            let delivery = uow.delivery_forms().find_by_shipment(&shipment.id).await?;
            shipments.push(ShipmentTrace {
                shipment,
                customer,
                delivery,
            });
        }

        info!(
            batch_id = %id,
            materials = materials.len(),
            shipments = shipments.len(),
            "Batch traced"
        );
        Ok(BatchTrace {
            batch,
            product,
            supervisor,
            stages,
            materials,
            xray_checks,
            shipments,
        })
    }

    /// 召回视图：某原材料批号流向了哪些批次、发货和客户
    pub async fn trace_lot(&self, raw_material_id: &RawMaterialId, lot_number: &str) -> AppResult<LotTrace> {
        let lot_number = lot_number.trim();
        if lot_number.is_empty() {
            return Err(AppError::validation("Lot number is required"));
        }

        let uow = self.uow_factory.read().await?;
        let uow = uow.as_ref();
        let raw_material = found(
            uow.raw_materials().find_by_id(raw_material_id).await?,
            "Raw material",
            raw_material_id,
        )?;

        let forms = uow
            .receiving_forms()
            .list_by_lot(raw_material_id, lot_number)
            .await?;
        let receipts = with_suppliers(uow, forms, &mut HashMap::new()).await?;

        let mut batch_ids: Vec<BatchId> = Vec::new();
        for usage in uow
            .production_materials()
            .list_by_lot(raw_material_id, lot_number)
            .await?
        {
            if !batch_ids.contains(&usage.batch_id) {
                batch_ids.push(usage.batch_id);
            }
        }
        let batches = if batch_ids.is_empty() {
            Vec::new()
        } else {
            uow.batches().find_by_ids(&batch_ids).await?
        };

        let mut shipments = Vec::new();
        for batch in &batches {
            shipments.extend(uow.shipments().list_by_batch(&batch.id).await?);
        }

        let mut seen: HashSet<CustomerId> = HashSet::new();
        let mut customers = Vec::new();
        for shipment in &shipments {
            if seen.insert(shipment.customer_id) {
                if let Some(customer) = uow.customers().find_by_id(&shipment.customer_id).await? {
                    customers.push(customer);
                }
            }
        }

        info!(
            raw_material_id = %raw_material_id,
            lot_number = %lot_number,
            batches = batches.len(),
            customers = customers.len(),
            "Lot traced"
        );
        Ok(LotTrace {
            raw_material,
            lot_number: lot_number.to_string(),
            receipts,
            batches,
            shipments,
            customers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{TestUow, handler_with};
    use crate::domain::entities::{Customer, ProductionBatch, ProductionMaterial, RawMaterial, Shipment};
    use crate::domain::enums::{BatchStatus, ShipmentStatus};
    use crate::domain::value_objects::{ProductId, ProductionMaterialId, ReceivingFormId, ShipmentId};
    use chrono::{NaiveDate, Utc};
    use foodtrace_common::AuditInfo;
    use foodtrace_domain_core::Quantity;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()
    }

    fn raw_material() -> RawMaterial {
        RawMaterial {
            id: RawMaterialId::new(),
            code: "SES".to_string(),
            name: "Sesame".to_string(),
            description: None,
            supplier_id: None,
            unit: "kg".to_string(),
            quantity_in_stock: Quantity::new(dec!(10)).unwrap(),
            reorder_level: Quantity::zero(),
            unit_cost: dec!(3),
            allergens: Some("sesame".to_string()),
            storage_conditions: None,
            audit_info: AuditInfo::default(),
        }
    }

    fn batch(id: BatchId) -> ProductionBatch {
        ProductionBatch {
            id,
            batch_number: format!("B-{}", id),
            product_id: ProductId::new(),
            supervisor_id: None,
            planned_quantity: Quantity::new(dec!(10)).unwrap(),
            produced_quantity: Some(Quantity::new(dec!(10)).unwrap()),
            status: BatchStatus::Completed,
            production_date: date(),
            expiry_date: None,
            started_at: None,
            completed_at: None,
            notes: None,
            audit_info: AuditInfo::default(),
        }
    }

    fn shipment(batch_id: BatchId, customer_id: CustomerId) -> Shipment {
        Shipment {
            id: ShipmentId::new(),
            shipment_number: format!("SH-{}", ShipmentId::new()),
            customer_id,
            product_id: ProductId::new(),
            batch_id: Some(batch_id),
            quantity: Quantity::new(dec!(1)).unwrap(),
            shipment_date: date(),
            status: ShipmentStatus::Shipped,
            carrier: None,
            tracking_number: None,
            notes: None,
            audit_info: AuditInfo::default(),
        }
    }

    #[tokio::test]
    async fn test_trace_lot_deduplicates_customers() {
        let m = raw_material();
        let raw_id = m.id;
        let supplier_id = SupplierId::new();
        let (b1, b2) = (BatchId::new(), BatchId::new());
        let customer_id = CustomerId::new();

        let mut uow = TestUow::default();
        uow.raw_materials
            .expect_find_by_id()
            .returning(move |_| Ok(Some(m.clone())));
        uow.receiving_forms
            .expect_list_by_lot()
            .withf(|_, lot| lot == "LOT-7")
            .returning(move |raw, lot| {
                Ok(vec![ReceivingForm {
                    id: ReceivingFormId::new(),
                    form_number: "RF-7".to_string(),
                    supplier_id,
                    raw_material_id: *raw,
                    quantity: Quantity::new(dec!(50)).unwrap(),
                    lot_number: lot.to_string(),
                    received_at: Utc::now(),
                    received_by: None,
                    expiry_date: None,
                    temperature_c: None,
                    packaging_intact: true,
                    accepted: true,
                    rejection_reason: None,
                    notes: None,
                    audit_info: AuditInfo::default(),
                }])
            });
        uow.suppliers.expect_find_by_id().times(1).returning(|_| Ok(None));
        uow.production_materials
            .expect_list_by_lot()
            .returning(move |raw, lot| {
                let usage = |batch_id| ProductionMaterial {
                    id: ProductionMaterialId::new(),
                    batch_id,
                    raw_material_id: *raw,
                    quantity_used: Quantity::new(dec!(2)).unwrap(),
                    lot_number: Some(lot.to_string()),
                    audit_info: AuditInfo::default(),
                };
                Ok(vec![usage(b1), usage(b2), usage(b1)])
            });
        uow.batches
            .expect_find_by_ids()
            .withf(|ids| ids.len() == 2)
            .returning(|ids| Ok(ids.iter().copied().map(batch).collect()));
        uow.shipments
            .expect_list_by_batch()
            .times(2)
            .returning(move |batch_id| Ok(vec![shipment(*batch_id, customer_id)]));
        uow.customers.expect_find_by_id().times(1).returning(|id| {
            Ok(Some(Customer {
                id: *id,
                code: "CUS-01".to_string(),
                name: "Corner Grocery".to_string(),
                contact_person: None,
                phone: None,
                email: None,
                address: None,
                audit_info: AuditInfo::default(),
            }))
        });

        let trace = handler_with(uow).trace_lot(&raw_id, " LOT-7 ").await.unwrap();
        assert_eq!(trace.lot_number, "LOT-7");
        assert_eq!(trace.receipts.len(), 1);
        assert_eq!(trace.batches.len(), 2);
        assert_eq!(trace.shipments.len(), 2);
        assert_eq!(trace.customers.len(), 1);
        assert_eq!(trace.customers[0].id, customer_id);
    }

    #[tokio::test]
    async fn test_trace_lot_requires_lot_number() {
        let err = handler_with(TestUow::default())
            .trace_lot(&RawMaterialId::new(), "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_trace_unknown_batch() {
        let mut uow = TestUow::default();
        uow.batches.expect_find_by_id().returning(|_| Ok(None));

        let err = handler_with(uow).trace_batch(&BatchId::new()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_trace_batch_collects_both_directions() {
        let b = batch(BatchId::new());
        let batch_id = b.id;
        let m = raw_material();
        let raw_id = m.id;
        let customer_id = CustomerId::new();

        let mut uow = TestUow::default();
        uow.batches
            .expect_find_by_id()
            .returning(move |_| Ok(Some(b.clone())));
        uow.products.expect_find_by_id().returning(|_| Ok(None));
        uow.stages.expect_list_by_batch().returning(|_| Ok(vec![]));
        uow.xray_checks.expect_list_by_batch().returning(|_| Ok(vec![]));
        uow.production_materials
            .expect_list_by_batch()
            .returning(move |batch_id| {
                Ok(vec![ProductionMaterial {
                    id: ProductionMaterialId::new(),
                    batch_id: *batch_id,
                    raw_material_id: raw_id,
                    quantity_used: Quantity::new(dec!(2)).unwrap(),
                    lot_number: None,
                    audit_info: AuditInfo::default(),
                }])
            });
        uow.raw_materials
            .expect_find_by_id()
            .returning(move |_| Ok(Some(m.clone())));
        uow.receiving_forms.expect_list_by_lot().never();
        uow.shipments
            .expect_list_by_batch()
            .returning(move |batch_id| Ok(vec![shipment(*batch_id, customer_id)]));
        uow.customers.expect_find_by_id().returning(|_| Ok(None));
        uow.delivery_forms
            .expect_find_by_shipment()
            .returning(|_| Ok(None));

        let trace = handler_with(uow).trace_batch(&batch_id).await.unwrap();
        assert_eq!(trace.materials.len(), 1);
        assert!(trace.materials[0].receipts.is_empty());
        assert_eq!(trace.shipments.len(), 1);
        assert_eq!(trace.shipments[0].shipment.customer_id, customer_id);
    }
}
