//! 物流处理：收货单、发货单、签收单

use chrono::Utc;
use foodtrace_common::{AuditInfo, PagedResult, Pagination};
use foodtrace_errors::{AppError, AppResult};
use rust_decimal::Decimal;
use tracing::info;

use super::production::ensure_user_exists;
use super::{ServiceHandler, clean, duplicate, found, positive_quantity, referenced, touch};
use crate::application::commands::*;
use crate::application::stock::{StockChange, apply_stock_change};
use crate::domain::UnitOfWork;
use crate::domain::entities::{DeliveryForm, ReceivingForm, Shipment};
use crate::domain::enums::{BatchStatus, MovementReason, ShipmentStatus, StockItemKind};
use crate::domain::repositories::{ReceivingFormFilter, ShipmentFilter};
use crate::domain::value_objects::{BatchId, DeliveryFormId, ProductId, ReceivingFormId, ShipmentId};

/// 收货单引用的供应商、原材料、收货人必须存在
async fn check_receiving_refs(uow: &dyn UnitOfWork, input: &ReceivingFormInput) -> AppResult<()> {
    referenced(
        uow.suppliers().find_by_id(&input.supplier_id).await?,
        "Supplier",
        input.supplier_id,
    )?;
    referenced(
        uow.raw_materials().find_by_id(&input.raw_material_id).await?,
        "Raw material",
        input.raw_material_id,
    )?;
    ensure_user_exists(uow, input.received_by.as_ref()).await
}

/// 发货单引用的客户、成品必须存在；指定批次时须已完工且为同一成品
async fn check_shipment_refs(uow: &dyn UnitOfWork, input: &ShipmentInput) -> AppResult<()> {
    referenced(
        uow.customers().find_by_id(&input.customer_id).await?,
        "Customer",
        input.customer_id,
    )?;
    referenced(
        uow.products().find_by_id(&input.product_id).await?,
        "Product",
        input.product_id,
    )?;
    if let Some(batch_id) = &input.batch_id {
        check_shipped_batch(uow, batch_id, &input.product_id).await?;
    }
    Ok(())
}

async fn check_shipped_batch(
    uow: &dyn UnitOfWork,
    batch_id: &BatchId,
    product_id: &ProductId,
) -> AppResult<()> {
    let batch = referenced(uow.batches().find_by_id(batch_id).await?, "Batch", batch_id)?;
    if batch.product_id != *product_id {
        return Err(AppError::validation(format!(
            "Batch {} does not produce product {}",
            batch.batch_number, product_id
        )));
    }
    if batch.status != BatchStatus::Completed {
        return Err(AppError::failed_precondition(format!(
            "Batch {} is {}, only completed batches can be shipped",
            batch.batch_number, batch.status
        )));
    }
    Ok(())
}

impl ServiceHandler {
    // ========== 收货单 ==========

    /// 登记收货；合格品入库
    pub async fn create_receiving_form(
        &self,
        actor: &Actor,
        input: ReceivingFormInput,
    ) -> AppResult<ReceivingFormId> {
        let quantity = positive_quantity("Quantity", input.quantity)?;

        let uow = self.uow_factory.begin().await?;
        check_receiving_refs(uow.as_ref(), &input).await?;

        let form = ReceivingForm {
            id: ReceivingFormId::new(),
            form_number: input.form_number.trim().to_string(),
            supplier_id: input.supplier_id,
            raw_material_id: input.raw_material_id,
            quantity,
            lot_number: input.lot_number.trim().to_string(),
            received_at: input.received_at.unwrap_or_else(Utc::now),
            received_by: input.received_by,
            expiry_date: input.expiry_date,
            temperature_c: input.temperature_c,
            packaging_intact: input.packaging_intact,
            accepted: input.accepted,
            rejection_reason: clean(input.rejection_reason),
            notes: clean(input.notes),
            audit_info: AuditInfo::new(actor.user_id.clone()),
        };
        form.validate()?;

        if uow
            .receiving_forms()
            .find_by_number(&form.form_number)
            .await?
            .is_some()
        {
            return Err(duplicate("Receiving form", "number", &form.form_number));
        }
        uow.receiving_forms().save(&form).await?;

        let change = StockChange::new(
            StockItemKind::RawMaterial,
            form.raw_material_id.into(),
            form.effective_quantity().value(),
            MovementReason::Receiving,
        )
        .reference(form.id);
        apply_stock_change(uow.as_ref(), change, actor).await?;
        uow.commit().await?;

        info!(
            receiving_form_id = %form.id,
            form_number = %form.form_number,
            lot_number = %form.lot_number,
            accepted = form.accepted,
            "Receiving form created"
        );
        Ok(form.id)
    }

    pub async fn get_receiving_form(&self, id: &ReceivingFormId) -> AppResult<ReceivingForm> {
        let uow = self.uow_factory.read().await?;
        found(uow.receiving_forms().find_by_id(id).await?, "Receiving form", id)
    }

    pub async fn list_receiving_forms(
        &self,
        filter: &ReceivingFormFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ReceivingForm>> {
        let uow = self.uow_factory.read().await?;
        uow.receiving_forms().list(filter, pagination).await
    }

    /// 修改收货单：入库数量差额或更换原材料同步到库存
    pub async fn update_receiving_form(
        &self,
        actor: &Actor,
        id: &ReceivingFormId,
        input: ReceivingFormInput,
    ) -> AppResult<()> {
        let quantity = positive_quantity("Quantity", input.quantity)?;

        let uow = self.uow_factory.begin().await?;
        let mut form = found(
            uow.receiving_forms().find_by_id(id).await?,
            "Receiving form",
            id,
        )?;
        check_receiving_refs(uow.as_ref(), &input).await?;

        let old_raw = form.raw_material_id;
        let old_effective = form.effective_quantity();

        form.form_number = input.form_number.trim().to_string();
        form.supplier_id = input.supplier_id;
        form.raw_material_id = input.raw_material_id;
        form.quantity = quantity;
        form.lot_number = input.lot_number.trim().to_string();
        if let Some(received_at) = input.received_at {
            form.received_at = received_at;
        }
        form.received_by = input.received_by;
        form.expiry_date = input.expiry_date;
        form.temperature_c = input.temperature_c;
        form.packaging_intact = input.packaging_intact;
        form.accepted = input.accepted;
        form.rejection_reason = clean(input.rejection_reason);
        form.notes = clean(input.notes);
        form.validate()?;

        if let Some(other) = uow.receiving_forms().find_by_number(&form.form_number).await? {
            if other.id != form.id {
                return Err(duplicate("Receiving form", "number", &form.form_number));
            }
        }

        let new_effective = form.effective_quantity();
        if form.raw_material_id != old_raw {
            let take_back = StockChange::new(
                StockItemKind::RawMaterial,
                old_raw.into(),
                -old_effective.value(),
                MovementReason::ReceivingReversal,
            )
            .reference(form.id);
            apply_stock_change(uow.as_ref(), take_back, actor).await?;

            let receive = StockChange::new(
                StockItemKind::RawMaterial,
                form.raw_material_id.into(),
                new_effective.value(),
                MovementReason::Receiving,
            )
            .reference(form.id);
            apply_stock_change(uow.as_ref(), receive, actor).await?;
        } else {
            let delta = new_effective.value() - old_effective.value();
            let reason = if delta > Decimal::ZERO {
                MovementReason::Receiving
            } else {
                MovementReason::ReceivingReversal
            };
            let change = StockChange::new(StockItemKind::RawMaterial, old_raw.into(), delta, reason)
                .reference(form.id);
            apply_stock_change(uow.as_ref(), change, actor).await?;
        }

        touch(&mut form, actor);
        uow.receiving_forms().update(&form).await?;
        uow.commit().await?;

        info!(receiving_form_id = %id, "Receiving form updated");
        Ok(())
    }

    /// 删除收货单并冲销入库；已被消耗时返回 Conflict
    pub async fn delete_receiving_form(&self, actor: &Actor, id: &ReceivingFormId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let form = found(
            uow.receiving_forms().find_by_id(id).await?,
            "Receiving form",
            id,
        )?;

        let change = StockChange::new(
            StockItemKind::RawMaterial,
            form.raw_material_id.into(),
            -form.effective_quantity().value(),
            MovementReason::ReceivingReversal,
        )
        .reference(form.id);
        apply_stock_change(uow.as_ref(), change, actor).await?;
        uow.receiving_forms().delete(id).await?;
        uow.commit().await?;

        info!(receiving_form_id = %id, form_number = %form.form_number, "Receiving form deleted");
        Ok(())
    }

    // ========== 发货单 ==========

    /// 创建发货单并扣减成品库存
    pub async fn create_shipment(&self, actor: &Actor, input: ShipmentInput) -> AppResult<ShipmentId> {
        let quantity = positive_quantity("Quantity", input.quantity)?;

        let uow = self.uow_factory.begin().await?;
        check_shipment_refs(uow.as_ref(), &input).await?;

        let shipment = Shipment {
            id: ShipmentId::new(),
            shipment_number: input.shipment_number.trim().to_string(),
            customer_id: input.customer_id,
            product_id: input.product_id,
            batch_id: input.batch_id,
            quantity,
            shipment_date: input.shipment_date,
            status: ShipmentStatus::Pending,
            carrier: clean(input.carrier),
            tracking_number: clean(input.tracking_number),
            notes: clean(input.notes),
            audit_info: AuditInfo::new(actor.user_id.clone()),
        };
        shipment.validate()?;

        if uow
            .shipments()
            .find_by_number(&shipment.shipment_number)
            .await?
            .is_some()
        {
            return Err(duplicate("Shipment", "number", &shipment.shipment_number));
        }
        uow.shipments().save(&shipment).await?;

        let change = StockChange::new(
            StockItemKind::FinishedProduct,
            shipment.product_id.into(),
            -quantity.value(),
            MovementReason::Shipment,
        )
        .reference(shipment.id);
        apply_stock_change(uow.as_ref(), change, actor).await?;
        uow.commit().await?;

        info!(
            shipment_id = %shipment.id,
            shipment_number = %shipment.shipment_number,
            customer_id = %shipment.customer_id,
            quantity = %quantity,
            "Shipment created"
        );
        Ok(shipment.id)
    }

    pub async fn get_shipment(&self, id: &ShipmentId) -> AppResult<Shipment> {
        let uow = self.uow_factory.read().await?;
        found(uow.shipments().find_by_id(id).await?, "Shipment", id)
    }

    pub async fn list_shipments(
        &self,
        filter: &ShipmentFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<Shipment>> {
        let uow = self.uow_factory.read().await?;
        uow.shipments().list(filter, pagination).await
    }

    /// 修改待发货单；数量或成品变化同步到库存
    pub async fn update_shipment(
        &self,
        actor: &Actor,
        id: &ShipmentId,
        input: ShipmentInput,
    ) -> AppResult<()> {
        let quantity = positive_quantity("Quantity", input.quantity)?;

        let uow = self.uow_factory.begin().await?;
        let mut shipment = found(uow.shipments().find_by_id(id).await?, "Shipment", id)?;
        shipment.ensure_pending()?;
        check_shipment_refs(uow.as_ref(), &input).await?;

        let old_product = shipment.product_id;
        let old_quantity = shipment.quantity;

        shipment.shipment_number = input.shipment_number.trim().to_string();
        shipment.customer_id = input.customer_id;
        shipment.product_id = input.product_id;
        shipment.batch_id = input.batch_id;
        shipment.quantity = quantity;
        shipment.shipment_date = input.shipment_date;
        shipment.carrier = clean(input.carrier);
        shipment.tracking_number = clean(input.tracking_number);
        shipment.notes = clean(input.notes);
        shipment.validate()?;

        if let Some(other) = uow.shipments().find_by_number(&shipment.shipment_number).await? {
            if other.id != shipment.id {
                return Err(duplicate("Shipment", "number", &shipment.shipment_number));
            }
        }

        if shipment.product_id != old_product {
            let give_back = StockChange::new(
                StockItemKind::FinishedProduct,
                old_product.into(),
                old_quantity.value(),
                MovementReason::ShipmentReversal,
            )
            .reference(shipment.id);
            apply_stock_change(uow.as_ref(), give_back, actor).await?;

            let take = StockChange::new(
                StockItemKind::FinishedProduct,
                shipment.product_id.into(),
                -quantity.value(),
                MovementReason::Shipment,
            )
            .reference(shipment.id);
            apply_stock_change(uow.as_ref(), take, actor).await?;
        } else {
            let delta = old_quantity.value() - quantity.value();
            let reason = if delta > Decimal::ZERO {
                MovementReason::ShipmentReversal
            } else {
                MovementReason::Shipment
            };
            let change =
                StockChange::new(StockItemKind::FinishedProduct, old_product.into(), delta, reason)
                    .reference(shipment.id);
            apply_stock_change(uow.as_ref(), change, actor).await?;
        }

        touch(&mut shipment, actor);
        uow.shipments().update(&shipment).await?;
        uow.commit().await?;

        info!(shipment_id = %id, "Shipment updated");
        Ok(())
    }

    pub async fn dispatch_shipment(&self, actor: &Actor, id: &ShipmentId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let mut shipment = found(uow.shipments().find_by_id(id).await?, "Shipment", id)?;
        shipment.dispatch()?;
        touch(&mut shipment, actor);
        uow.shipments().update(&shipment).await?;
        uow.commit().await?;

        info!(shipment_id = %id, "Shipment dispatched");
        Ok(())
    }

    /// 取消发货并退回库存
    pub async fn cancel_shipment(&self, actor: &Actor, id: &ShipmentId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let mut shipment = found(uow.shipments().find_by_id(id).await?, "Shipment", id)?;
        shipment.cancel()?;
        touch(&mut shipment, actor);
        uow.shipments().update(&shipment).await?;

        let change = StockChange::new(
            StockItemKind::FinishedProduct,
            shipment.product_id.into(),
            shipment.quantity.value(),
            MovementReason::ShipmentReversal,
        )
        .reference(shipment.id);
        apply_stock_change(uow.as_ref(), change, actor).await?;
        uow.commit().await?;

        info!(shipment_id = %id, "Shipment cancelled");
        Ok(())
    }

    /// 删除发货单；已签收的不能删除，未取消的退回库存
    pub async fn delete_shipment(&self, actor: &Actor, id: &ShipmentId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let shipment = found(uow.shipments().find_by_id(id).await?, "Shipment", id)?;
        shipment.ensure_deletable()?;

        if shipment.status != ShipmentStatus::Cancelled {
            let change = StockChange::new(
                StockItemKind::FinishedProduct,
                shipment.product_id.into(),
                shipment.quantity.value(),
                MovementReason::ShipmentReversal,
            )
            .reference(shipment.id);
            apply_stock_change(uow.as_ref(), change, actor).await?;
        }
        uow.shipments().delete(id).await?;
        uow.commit().await?;

        info!(shipment_id = %id, shipment_number = %shipment.shipment_number, "Shipment deleted");
        Ok(())
    }

    // ========== 签收单 ==========

    /// 登记签收，发货单转为已送达
    pub async fn create_delivery_form(
        &self,
        actor: &Actor,
        shipment_id: &ShipmentId,
        input: DeliveryFormInput,
    ) -> AppResult<DeliveryFormId> {
        let uow = self.uow_factory.begin().await?;
        let mut shipment = found(
            uow.shipments().find_by_id(shipment_id).await?,
            "Shipment",
            shipment_id,
        )?;
        if uow
            .delivery_forms()
            .find_by_shipment(shipment_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "Shipment {} already has a delivery form",
                shipment.shipment_number
            )));
        }

        let form = DeliveryForm {
            id: DeliveryFormId::new(),
            shipment_id: shipment.id,
            delivered_at: input.delivered_at.unwrap_or_else(Utc::now),
            recipient_name: input.recipient_name.trim().to_string(),
            vehicle_number: clean(input.vehicle_number),
            driver_name: clean(input.driver_name),
            temperature_c: input.temperature_c,
            condition: input.condition,
            notes: clean(input.notes),
            audit_info: AuditInfo::new(actor.user_id.clone()),
        };
        form.validate()?;

        shipment.mark_delivered()?;
        touch(&mut shipment, actor);
        uow.shipments().update(&shipment).await?;
        uow.delivery_forms().save(&form).await?;
        uow.commit().await?;

        info!(delivery_form_id = %form.id, shipment_id = %shipment_id, condition = %form.condition, "Delivery recorded");
        Ok(form.id)
    }

    pub async fn get_delivery_form(&self, id: &DeliveryFormId) -> AppResult<DeliveryForm> {
        let uow = self.uow_factory.read().await?;
        found(uow.delivery_forms().find_by_id(id).await?, "Delivery form", id)
    }

    pub async fn get_delivery_for_shipment(&self, shipment_id: &ShipmentId) -> AppResult<DeliveryForm> {
        let uow = self.uow_factory.read().await?;
        found(
            uow.delivery_forms().find_by_shipment(shipment_id).await?,
            "Delivery form for shipment",
            shipment_id,
        )
    }

    pub async fn update_delivery_form(
        &self,
        actor: &Actor,
        id: &DeliveryFormId,
        input: DeliveryFormInput,
    ) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let mut form = found(uow.delivery_forms().find_by_id(id).await?, "Delivery form", id)?;

        if let Some(delivered_at) = input.delivered_at {
            form.delivered_at = delivered_at;
        }
        form.recipient_name = input.recipient_name.trim().to_string();
        form.vehicle_number = clean(input.vehicle_number);
        form.driver_name = clean(input.driver_name);
        form.temperature_c = input.temperature_c;
        form.condition = input.condition;
        form.notes = clean(input.notes);
        form.validate()?;

        touch(&mut form, actor);
        uow.delivery_forms().update(&form).await?;
        uow.commit().await?;

        info!(delivery_form_id = %id, "Delivery form updated");
        Ok(())
    }

    /// 删除签收单，发货单退回已发出
    pub async fn delete_delivery_form(&self, actor: &Actor, id: &DeliveryFormId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let form = found(uow.delivery_forms().find_by_id(id).await?, "Delivery form", id)?;
        let mut shipment = found(
            uow.shipments().find_by_id(&form.shipment_id).await?,
            "Shipment",
            form.shipment_id,
        )?;
        shipment.revert_delivery()?;
        touch(&mut shipment, actor);
        uow.shipments().update(&shipment).await?;
        uow.delivery_forms().delete(id).await?;
        uow.commit().await?;

        info!(delivery_form_id = %id, shipment_id = %form.shipment_id, "Delivery form deleted");
        Ok(())
    }
}
