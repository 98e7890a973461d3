//! 主数据实体：供应商、原材料、成品、客户、用户

use chrono::NaiveDate;
use foodtrace_common::{AuditInfo, UserId};
use foodtrace_domain_core::Quantity;
use foodtrace_errors::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::rules;
use crate::domain::enums::UserRole;
use crate::domain::value_objects::{CustomerId, ProductId, RawMaterialId, SupplierId};

/// 供应商
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub code: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// 是否为合格供应商
    pub is_approved: bool,
    pub audit_info: AuditInfo,
}

impl Supplier {
    pub fn validate(&self) -> AppResult<()> {
        rules::require_text("Supplier code", &self.code, 20)?;
        rules::require_text("Supplier name", &self.name, 100)?;
        rules::optional_text("Contact person", self.contact_person.as_deref(), 100)?;
        rules::optional_text("Phone", self.phone.as_deref(), 30)?;
        rules::optional_email(self.email.as_deref())?;
        rules::optional_text("Address", self.address.as_deref(), 255)
    }
}

/// 原材料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMaterial {
    pub id: RawMaterialId,
    /// 物料编码（SKU）
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub supplier_id: Option<SupplierId>,
    /// 计量单位（KG、L、PC 等）
    pub unit: String,
    /// 当前库存，只能通过库存流水变更
    pub quantity_in_stock: Quantity,
    /// 再订货点
    pub reorder_level: Quantity,
    pub unit_cost: Decimal,
    pub allergens: Option<String>,
    pub storage_conditions: Option<String>,
    pub audit_info: AuditInfo,
}

impl RawMaterial {
    pub fn validate(&self) -> AppResult<()> {
        rules::require_text("Raw material code", &self.code, 30)?;
        rules::require_text("Raw material name", &self.name, 100)?;
        rules::require_text("Unit", &self.unit, 10)?;
        rules::optional_text("Description", self.description.as_deref(), 500)?;
        rules::price("Unit cost", self.unit_cost)?;
        rules::optional_text("Allergens", self.allergens.as_deref(), 255)?;
        rules::optional_text("Storage conditions", self.storage_conditions.as_deref(), 255)
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity_in_stock <= self.reorder_level
    }
}

/// 成品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedProduct {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    pub unit_price: Decimal,
    /// 当前库存，只能通过库存流水变更
    pub quantity_in_stock: Quantity,
    /// 保质期（天）
    pub shelf_life_days: Option<i32>,
    pub audit_info: AuditInfo,
}

impl FinishedProduct {
    pub fn validate(&self) -> AppResult<()> {
        rules::require_text("SKU", &self.sku, 30)?;
        rules::require_text("Product name", &self.name, 100)?;
        rules::require_text("Unit", &self.unit, 10)?;
        rules::optional_text("Description", self.description.as_deref(), 500)?;
        rules::price("Unit price", self.unit_price)?;
        if let Some(days) = self.shelf_life_days {
            if days <= 0 {
                return Err(AppError::validation("Shelf life must be at least one day"));
            }
        }
        Ok(())
    }

    /// 根据生产日期推算到期日
    pub fn expiry_for(&self, production_date: NaiveDate) -> Option<NaiveDate> {
        self.shelf_life_days
            .and_then(|days| production_date.checked_add_days(chrono::Days::new(days as u64)))
    }
}

/// 客户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub code: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub audit_info: AuditInfo,
}

impl Customer {
    pub fn validate(&self) -> AppResult<()> {
        rules::require_text("Customer code", &self.code, 20)?;
        rules::require_text("Customer name", &self.name, 100)?;
        rules::optional_text("Contact person", self.contact_person.as_deref(), 100)?;
        rules::optional_text("Phone", self.phone.as_deref(), 30)?;
        rules::optional_email(self.email.as_deref())?;
        rules::optional_text("Address", self.address.as_deref(), 255)
    }
}

/// 系统用户（仅作为主管、操作员、检验员等引用，不含认证信息）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub audit_info: AuditInfo,
}

impl User {
    pub fn validate(&self) -> AppResult<()> {
        rules::require_text("Username", &self.username, 50)?;
        if self.username.chars().any(char::is_whitespace) {
            return Err(AppError::validation("Username must not contain whitespace"));
        }
        rules::require_text("Full name", &self.full_name, 100)?;
        rules::optional_email(self.email.as_deref())
    }

    /// 校验该用户能否担任批次主管
    pub fn ensure_can_supervise(&self) -> AppResult<()> {
        if !self.is_active {
            return Err(AppError::failed_precondition(format!(
                "User {} is inactive",
                self.username
            )));
        }
        if !self.role.can_supervise() {
            return Err(AppError::validation(format!(
                "User {} with role {} cannot supervise a batch",
                self.username, self.role
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn flour() -> RawMaterial {
        RawMaterial {
            id: RawMaterialId::new(),
            code: "RM-FLOUR".to_string(),
            name: "Wheat flour".to_string(),
            description: None,
            supplier_id: None,
            unit: "KG".to_string(),
            quantity_in_stock: Quantity::new(dec!(50)).unwrap(),
            reorder_level: Quantity::new(dec!(100)).unwrap(),
            unit_cost: dec!(0.85),
            allergens: Some("gluten".to_string()),
            storage_conditions: None,
            audit_info: AuditInfo::default(),
        }
    }

    #[test]
    fn test_raw_material_validation() {
        let mut material = flour();
        assert!(material.validate().is_ok());
        assert!(material.is_low_stock());

        material.unit_cost = dec!(-1);
        assert!(matches!(material.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_supplier_rejects_bad_email() {
        let supplier = Supplier {
            id: SupplierId::new(),
            code: "SUP-1".to_string(),
            name: "Mill Co".to_string(),
            contact_person: None,
            phone: None,
            email: Some("mill-at-example".to_string()),
            address: None,
            is_approved: true,
            audit_info: AuditInfo::default(),
        };
        assert!(supplier.validate().is_err());
    }

    #[test]
    fn test_product_expiry() {
        let product = FinishedProduct {
            id: ProductId::new(),
            sku: "BREAD-01".to_string(),
            name: "White loaf".to_string(),
            description: None,
            unit: "PC".to_string(),
            unit_price: dec!(2.50),
            quantity_in_stock: Quantity::zero(),
            shelf_life_days: Some(5),
            audit_info: AuditInfo::default(),
        };
        let produced = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
        assert_eq!(
            product.expiry_for(produced),
            NaiveDate::from_ymd_opt(2024, 3, 3)
        );
    }

    #[test]
    fn test_inactive_user_cannot_supervise() {
        let mut user = User {
            id: UserId::new(),
            username: "jdoe".to_string(),
            full_name: "J. Doe".to_string(),
            email: None,
            role: UserRole::Supervisor,
            is_active: true,
            audit_info: AuditInfo::default(),
        };
        assert!(user.ensure_can_supervise().is_ok());

        user.role = UserRole::Operator;
        assert!(matches!(user.ensure_can_supervise(), Err(AppError::Validation(_))));

        user.role = UserRole::Admin;
        user.is_active = false;
        assert!(matches!(
            user.ensure_can_supervise(),
            Err(AppError::FailedPrecondition(_))
        ));
    }
}
