//! 物流实体：收货单、发货单、签收单

use chrono::{DateTime, NaiveDate, Utc};
use foodtrace_common::{AuditInfo, UserId};
use foodtrace_domain_core::Quantity;
use foodtrace_errors::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::rules;
use crate::domain::enums::{DeliveryCondition, ShipmentStatus};
use crate::domain::value_objects::{
    BatchId, CustomerId, DeliveryFormId, ProductId, RawMaterialId, ReceivingFormId, ShipmentId,
    SupplierId,
};

/// 原材料收货单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivingForm {
    pub id: ReceivingFormId,
    pub form_number: String,
    pub supplier_id: SupplierId,
    pub raw_material_id: RawMaterialId,
    pub quantity: Quantity,
    pub lot_number: String,
    pub received_at: DateTime<Utc>,
    pub received_by: Option<UserId>,
    pub expiry_date: Option<NaiveDate>,
    pub temperature_c: Option<Decimal>,
    pub packaging_intact: bool,
    /// 拒收的货物不入库
    pub accepted: bool,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
    pub audit_info: AuditInfo,
}

impl ReceivingForm {
    pub fn validate(&self) -> AppResult<()> {
        rules::require_text("Form number", &self.form_number, 30)?;
        rules::require_text("Lot number", &self.lot_number, 50)?;
        if self.quantity.is_zero() {
            return Err(AppError::validation("Received quantity must be greater than zero"));
        }
        if !self.accepted
            && self
                .rejection_reason
                .as_deref()
                .is_none_or(|r| r.trim().is_empty())
        {
            return Err(AppError::validation(
                "Rejection reason is required when goods are not accepted",
            ));
        }
        rules::temperature(self.temperature_c)?;
        rules::optional_text("Rejection reason", self.rejection_reason.as_deref(), 255)?;
        rules::optional_text("Notes", self.notes.as_deref(), 1000)
    }

    /// 实际入库数量
    pub fn effective_quantity(&self) -> Quantity {
        if self.accepted {
            self.quantity
        } else {
            Quantity::zero()
        }
    }
}

/// 成品发货单
///
/// 创建即扣减成品库存；取消或删除未取消的发货单时退回。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub shipment_number: String,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub batch_id: Option<BatchId>,
    pub quantity: Quantity,
    pub shipment_date: NaiveDate,
    pub status: ShipmentStatus,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub audit_info: AuditInfo,
}

impl Shipment {
    pub fn validate(&self) -> AppResult<()> {
        rules::require_text("Shipment number", &self.shipment_number, 30)?;
        if self.quantity.is_zero() {
            return Err(AppError::validation("Shipment quantity must be greater than zero"));
        }
        rules::optional_text("Carrier", self.carrier.as_deref(), 100)?;
        rules::optional_text("Tracking number", self.tracking_number.as_deref(), 100)?;
        rules::optional_text("Notes", self.notes.as_deref(), 1000)
    }

    pub fn ensure_pending(&self) -> AppResult<()> {
        if self.status != ShipmentStatus::Pending {
            return Err(self.transition_error("modify"));
        }
        Ok(())
    }

    pub fn dispatch(&mut self) -> AppResult<()> {
        if self.status != ShipmentStatus::Pending {
            return Err(self.transition_error("dispatch"));
        }
        self.status = ShipmentStatus::Shipped;
        Ok(())
    }

    pub fn cancel(&mut self) -> AppResult<()> {
        if !matches!(self.status, ShipmentStatus::Pending | ShipmentStatus::Shipped) {
            return Err(self.transition_error("cancel"));
        }
        self.status = ShipmentStatus::Cancelled;
        Ok(())
    }

    pub fn mark_delivered(&mut self) -> AppResult<()> {
        if self.status != ShipmentStatus::Shipped {
            return Err(self.transition_error("deliver"));
        }
        self.status = ShipmentStatus::Delivered;
        Ok(())
    }

    /// 删除签收单后回到已发出
    pub fn revert_delivery(&mut self) -> AppResult<()> {
        if self.status != ShipmentStatus::Delivered {
            return Err(self.transition_error("revert delivery of"));
        }
        self.status = ShipmentStatus::Shipped;
        Ok(())
    }

    pub fn ensure_deletable(&self) -> AppResult<()> {
        if self.status == ShipmentStatus::Delivered {
            return Err(AppError::failed_precondition(format!(
                "Shipment {} has been delivered and cannot be deleted",
                self.shipment_number
            )));
        }
        Ok(())
    }

    fn transition_error(&self, action: &str) -> AppError {
        AppError::failed_precondition(format!(
            "Cannot {} shipment {} in status {}",
            action, self.shipment_number, self.status
        ))
    }
}

/// 客户签收单，每张发货单最多一张
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryForm {
    pub id: DeliveryFormId,
    pub shipment_id: ShipmentId,
    pub delivered_at: DateTime<Utc>,
    pub recipient_name: String,
    pub vehicle_number: Option<String>,
    pub driver_name: Option<String>,
    pub temperature_c: Option<Decimal>,
    pub condition: DeliveryCondition,
    pub notes: Option<String>,
    pub audit_info: AuditInfo,
}

impl DeliveryForm {
    pub fn validate(&self) -> AppResult<()> {
        rules::require_text("Recipient name", &self.recipient_name, 100)?;
        rules::optional_text("Vehicle number", self.vehicle_number.as_deref(), 30)?;
        rules::optional_text("Driver name", self.driver_name.as_deref(), 100)?;
        rules::temperature(self.temperature_c)?;
        rules::optional_text("Notes", self.notes.as_deref(), 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn receiving(accepted: bool, reason: Option<&str>) -> ReceivingForm {
        ReceivingForm {
            id: ReceivingFormId::new(),
            form_number: "RF-0001".to_string(),
            supplier_id: SupplierId::new(),
            raw_material_id: RawMaterialId::new(),
            quantity: Quantity::new(dec!(250)).unwrap(),
            lot_number: "LOT-A1".to_string(),
            received_at: Utc::now(),
            received_by: None,
            expiry_date: None,
            temperature_c: Some(dec!(3.5)),
            packaging_intact: true,
            accepted,
            rejection_reason: reason.map(str::to_string),
            notes: None,
            audit_info: AuditInfo::default(),
        }
    }

    fn shipment() -> Shipment {
        Shipment {
            id: ShipmentId::new(),
            shipment_number: "SH-0001".to_string(),
            customer_id: CustomerId::new(),
            product_id: ProductId::new(),
            batch_id: None,
            quantity: Quantity::new(dec!(40)).unwrap(),
            shipment_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            status: ShipmentStatus::Pending,
            carrier: None,
            tracking_number: None,
            notes: None,
            audit_info: AuditInfo::default(),
        }
    }

    #[test]
    fn test_effective_quantity() {
        assert_eq!(receiving(true, None).effective_quantity().value(), dec!(250));
        assert!(receiving(false, Some("wet")).effective_quantity().is_zero());
    }

    #[test]
    fn test_rejected_form_needs_reason() {
        assert!(receiving(false, None).validate().is_err());
        assert!(receiving(false, Some("  ")).validate().is_err());
        assert!(receiving(false, Some("damaged packaging")).validate().is_ok());
        assert!(receiving(true, None).validate().is_ok());
    }

    #[test]
    fn test_shipment_lifecycle() {
        let mut s = shipment();
        assert!(s.mark_delivered().is_err());
        s.dispatch().unwrap();
        assert!(s.ensure_pending().is_err());
        s.mark_delivered().unwrap();
        assert!(matches!(s.ensure_deletable(), Err(AppError::FailedPrecondition(_))));
        assert!(s.cancel().is_err());

        s.revert_delivery().unwrap();
        assert_eq!(s.status, ShipmentStatus::Shipped);
        s.cancel().unwrap();
        assert!(!s.status.holds_stock());
        assert!(s.ensure_deletable().is_ok());
    }
}
