//! 主数据处理：供应商、原材料、成品、客户、用户

use foodtrace_common::{AuditInfo, PagedResult, Pagination, UserId};
use foodtrace_domain_core::Quantity;
use foodtrace_errors::AppResult;
use tracing::info;

use super::{ServiceHandler, clean, duplicate, found, quantity, referenced, touch};
use crate::application::commands::*;
use crate::application::stock::{StockChange, apply_stock_change};
use crate::domain::entities::{Customer, FinishedProduct, RawMaterial, Supplier, User};
use crate::domain::enums::{MovementReason, StockItemKind};
use crate::domain::repositories::{RawMaterialFilter, TextFilter, UserFilter};
use crate::domain::value_objects::{CustomerId, ProductId, RawMaterialId, SupplierId};

impl ServiceHandler {
    // ========== 供应商 ==========

    pub async fn create_supplier(&self, actor: &Actor, input: SupplierInput) -> AppResult<SupplierId> {
        let supplier = Supplier {
            id: SupplierId::new(),
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            contact_person: clean(input.contact_person),
            phone: clean(input.phone),
            email: clean(input.email),
            address: clean(input.address),
            is_approved: input.is_approved,
            audit_info: AuditInfo::new(actor.user_id.clone()),
        };
        supplier.validate()?;

        let uow = self.uow_factory.begin().await?;
        if uow.suppliers().find_by_code(&supplier.code).await?.is_some() {
            return Err(duplicate("Supplier", "code", &supplier.code));
        }
        uow.suppliers().save(&supplier).await?;
        uow.commit().await?;

        info!(supplier_id = %supplier.id, code = %supplier.code, "Supplier created");
        Ok(supplier.id)
    }

    pub async fn get_supplier(&self, id: &SupplierId) -> AppResult<Supplier> {
        let uow = self.uow_factory.read().await?;
        found(uow.suppliers().find_by_id(id).await?, "Supplier", id)
    }

    pub async fn list_suppliers(
        &self,
        filter: &TextFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<Supplier>> {
        let uow = self.uow_factory.read().await?;
        uow.suppliers().list(filter, pagination).await
    }

    pub async fn update_supplier(
        &self,
        actor: &Actor,
        id: &SupplierId,
        input: SupplierInput,
    ) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let mut supplier = found(uow.suppliers().find_by_id(id).await?, "Supplier", id)?;

        supplier.code = input.code.trim().to_string();
        supplier.name = input.name.trim().to_string();
        supplier.contact_person = clean(input.contact_person);
        supplier.phone = clean(input.phone);
        supplier.email = clean(input.email);
        supplier.address = clean(input.address);
        supplier.is_approved = input.is_approved;
        supplier.validate()?;

        if let Some(other) = uow.suppliers().find_by_code(&supplier.code).await? {
            if other.id != supplier.id {
                return Err(duplicate("Supplier", "code", &supplier.code));
            }
        }

        touch(&mut supplier, actor);
        uow.suppliers().update(&supplier).await?;
        uow.commit().await?;

        info!(supplier_id = %id, "Supplier updated");
        Ok(())
    }

    pub async fn delete_supplier(&self, id: &SupplierId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        found(uow.suppliers().find_by_id(id).await?, "Supplier", id)?;
        uow.suppliers().delete(id).await?;
        uow.commit().await?;

        info!(supplier_id = %id, "Supplier deleted");
        Ok(())
    }

    // ========== 原材料 ==========

    pub async fn create_raw_material(
        &self,
        actor: &Actor,
        input: RawMaterialInput,
    ) -> AppResult<RawMaterialId> {
        let opening_stock = input
            .opening_stock
            .map(|v| quantity("Opening stock", v))
            .transpose()?;

        let material = RawMaterial {
            id: RawMaterialId::new(),
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            description: clean(input.description),
            supplier_id: input.supplier_id,
            unit: input.unit.trim().to_uppercase(),
            quantity_in_stock: Quantity::zero(),
            reorder_level: quantity("Reorder level", input.reorder_level)?,
            unit_cost: input.unit_cost,
            allergens: clean(input.allergens),
            storage_conditions: clean(input.storage_conditions),
            audit_info: AuditInfo::new(actor.user_id.clone()),
        };
        material.validate()?;

        let uow = self.uow_factory.begin().await?;
        if let Some(supplier_id) = &material.supplier_id {
            referenced(uow.suppliers().find_by_id(supplier_id).await?, "Supplier", supplier_id)?;
        }
        if uow.raw_materials().find_by_code(&material.code).await?.is_some() {
            return Err(duplicate("Raw material", "code", &material.code));
        }
        uow.raw_materials().save(&material).await?;

        if let Some(opening) = opening_stock {
            let change = StockChange::new(
                StockItemKind::RawMaterial,
                material.id.into(),
                opening.value(),
                MovementReason::Adjustment,
            )
            .note(Some("Opening stock".to_string()));
            apply_stock_change(uow.as_ref(), change, actor).await?;
        }
        uow.commit().await?;

        info!(raw_material_id = %material.id, code = %material.code, "Raw material created");
        Ok(material.id)
    }

    pub async fn get_raw_material(&self, id: &RawMaterialId) -> AppResult<RawMaterial> {
        let uow = self.uow_factory.read().await?;
        found(uow.raw_materials().find_by_id(id).await?, "Raw material", id)
    }

    pub async fn list_raw_materials(
        &self,
        filter: &RawMaterialFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<RawMaterial>> {
        let uow = self.uow_factory.read().await?;
        uow.raw_materials().list(filter, pagination).await
    }

    /// 更新原材料，库存数量保持不变
    pub async fn update_raw_material(
        &self,
        actor: &Actor,
        id: &RawMaterialId,
        input: RawMaterialInput,
    ) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let mut material = found(uow.raw_materials().find_by_id(id).await?, "Raw material", id)?;

        material.code = input.code.trim().to_string();
        material.name = input.name.trim().to_string();
        material.description = clean(input.description);
        material.supplier_id = input.supplier_id;
        material.unit = input.unit.trim().to_uppercase();
        material.reorder_level = quantity("Reorder level", input.reorder_level)?;
        material.unit_cost = input.unit_cost;
        material.allergens = clean(input.allergens);
        material.storage_conditions = clean(input.storage_conditions);
        material.validate()?;

        if let Some(supplier_id) = &material.supplier_id {
            referenced(uow.suppliers().find_by_id(supplier_id).await?, "Supplier", supplier_id)?;
        }
        if let Some(other) = uow.raw_materials().find_by_code(&material.code).await? {
            if other.id != material.id {
                return Err(duplicate("Raw material", "code", &material.code));
            }
        }

        touch(&mut material, actor);
        uow.raw_materials().update(&material).await?;
        uow.commit().await?;

        info!(raw_material_id = %id, "Raw material updated");
        Ok(())
    }

    pub async fn delete_raw_material(&self, id: &RawMaterialId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        found(uow.raw_materials().find_by_id(id).await?, "Raw material", id)?;
        uow.raw_materials().delete(id).await?;
        uow.commit().await?;

        info!(raw_material_id = %id, "Raw material deleted");
        Ok(())
    }

    // ========== 成品 ==========

    pub async fn create_product(&self, actor: &Actor, input: ProductInput) -> AppResult<ProductId> {
        let opening_stock = input
            .opening_stock
            .map(|v| quantity("Opening stock", v))
            .transpose()?;

        let product = FinishedProduct {
            id: ProductId::new(),
            sku: input.sku.trim().to_string(),
            name: input.name.trim().to_string(),
            description: clean(input.description),
            unit: input.unit.trim().to_uppercase(),
            unit_price: input.unit_price,
            quantity_in_stock: Quantity::zero(),
            shelf_life_days: input.shelf_life_days,
            audit_info: AuditInfo::new(actor.user_id.clone()),
        };
        product.validate()?;

        let uow = self.uow_factory.begin().await?;
        if uow.products().find_by_sku(&product.sku).await?.is_some() {
            return Err(duplicate("Product", "SKU", &product.sku));
        }
        uow.products().save(&product).await?;

        if let Some(opening) = opening_stock {
            let change = StockChange::new(
                StockItemKind::FinishedProduct,
                product.id.into(),
                opening.value(),
                MovementReason::Adjustment,
            )
            .note(Some("Opening stock".to_string()));
            apply_stock_change(uow.as_ref(), change, actor).await?;
        }
        uow.commit().await?;

        info!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product.id)
    }

    pub async fn get_product(&self, id: &ProductId) -> AppResult<FinishedProduct> {
        let uow = self.uow_factory.read().await?;
        found(uow.products().find_by_id(id).await?, "Product", id)
    }

    pub async fn list_products(
        &self,
        filter: &TextFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<FinishedProduct>> {
        let uow = self.uow_factory.read().await?;
        uow.products().list(filter, pagination).await
    }

    pub async fn update_product(
        &self,
        actor: &Actor,
        id: &ProductId,
        input: ProductInput,
    ) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let mut product = found(uow.products().find_by_id(id).await?, "Product", id)?;

        product.sku = input.sku.trim().to_string();
        product.name = input.name.trim().to_string();
        product.description = clean(input.description);
        product.unit = input.unit.trim().to_uppercase();
        product.unit_price = input.unit_price;
        product.shelf_life_days = input.shelf_life_days;
        product.validate()?;

        if let Some(other) = uow.products().find_by_sku(&product.sku).await? {
            if other.id != product.id {
                return Err(duplicate("Product", "SKU", &product.sku));
            }
        }

        touch(&mut product, actor);
        uow.products().update(&product).await?;
        uow.commit().await?;

        info!(product_id = %id, "Product updated");
        Ok(())
    }

    pub async fn delete_product(&self, id: &ProductId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        found(uow.products().find_by_id(id).await?, "Product", id)?;
        uow.products().delete(id).await?;
        uow.commit().await?;

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    // ========== 客户 ==========

    pub async fn create_customer(&self, actor: &Actor, input: CustomerInput) -> AppResult<CustomerId> {
        let customer = Customer {
            id: CustomerId::new(),
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            contact_person: clean(input.contact_person),
            phone: clean(input.phone),
            email: clean(input.email),
            address: clean(input.address),
            audit_info: AuditInfo::new(actor.user_id.clone()),
        };
        customer.validate()?;

        let uow = self.uow_factory.begin().await?;
        if uow.customers().find_by_code(&customer.code).await?.is_some() {
            return Err(duplicate("Customer", "code", &customer.code));
        }
        uow.customers().save(&customer).await?;
        uow.commit().await?;

        info!(customer_id = %customer.id, code = %customer.code, "Customer created");
        Ok(customer.id)
    }

    pub async fn get_customer(&self, id: &CustomerId) -> AppResult<Customer> {
        let uow = self.uow_factory.read().await?;
        found(uow.customers().find_by_id(id).await?, "Customer", id)
    }

    pub async fn list_customers(
        &self,
        filter: &TextFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<Customer>> {
        let uow = self.uow_factory.read().await?;
        uow.customers().list(filter, pagination).await
    }

    pub async fn update_customer(
        &self,
        actor: &Actor,
        id: &CustomerId,
        input: CustomerInput,
    ) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let mut customer = found(uow.customers().find_by_id(id).await?, "Customer", id)?;

        customer.code = input.code.trim().to_string();
        customer.name = input.name.trim().to_string();
        customer.contact_person = clean(input.contact_person);
        customer.phone = clean(input.phone);
        customer.email = clean(input.email);
        customer.address = clean(input.address);
        customer.validate()?;

        if let Some(other) = uow.customers().find_by_code(&customer.code).await? {
            if other.id != customer.id {
                return Err(duplicate("Customer", "code", &customer.code));
            }
        }

        touch(&mut customer, actor);
        uow.customers().update(&customer).await?;
        uow.commit().await?;

        info!(customer_id = %id, "Customer updated");
        Ok(())
    }

    pub async fn delete_customer(&self, id: &CustomerId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        found(uow.customers().find_by_id(id).await?, "Customer", id)?;
        uow.customers().delete(id).await?;
        uow.commit().await?;

        info!(customer_id = %id, "Customer deleted");
        Ok(())
    }

    // ========== 用户 ==========

    pub async fn create_user(&self, actor: &Actor, input: UserInput) -> AppResult<UserId> {
        let user = User {
            id: UserId::new(),
            username: input.username.trim().to_lowercase(),
            full_name: input.full_name.trim().to_string(),
            email: clean(input.email),
            role: input.role,
            is_active: input.is_active,
            audit_info: AuditInfo::new(actor.user_id.clone()),
        };
        user.validate()?;

        let uow = self.uow_factory.begin().await?;
        if uow.users().find_by_username(&user.username).await?.is_some() {
            return Err(duplicate("User", "username", &user.username));
        }
        uow.users().save(&user).await?;
        uow.commit().await?;

        info!(user_id = %user.id, username = %user.username, role = %user.role, "User created");
        Ok(user.id)
    }

    pub async fn get_user(&self, id: &UserId) -> AppResult<User> {
        let uow = self.uow_factory.read().await?;
        found(uow.users().find_by_id(id).await?, "User", id)
    }

    pub async fn list_users(
        &self,
        filter: &UserFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<User>> {
        let uow = self.uow_factory.read().await?;
        uow.users().list(filter, pagination).await
    }

    pub async fn update_user(&self, actor: &Actor, id: &UserId, input: UserInput) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let mut user = found(uow.users().find_by_id(id).await?, "User", id)?;

        user.username = input.username.trim().to_lowercase();
        user.full_name = input.full_name.trim().to_string();
        user.email = clean(input.email);
        user.role = input.role;
        user.is_active = input.is_active;
        user.validate()?;

        if let Some(other) = uow.users().find_by_username(&user.username).await? {
            if other.id != user.id {
                return Err(duplicate("User", "username", &user.username));
            }
        }

        touch(&mut user, actor);
        uow.users().update(&user).await?;
        uow.commit().await?;

        info!(user_id = %id, "User updated");
        Ok(())
    }

    pub async fn delete_user(&self, id: &UserId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        found(uow.users().find_by_id(id).await?, "User", id)?;
        uow.users().delete(id).await?;
        uow.commit().await?;

        info!(user_id = %id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{TestUow, handler_with};
    use foodtrace_errors::AppError;
    use mockall::predicate::eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::Ordering;

    fn supplier_input(code: &str) -> SupplierInput {
        SupplierInput {
            code: code.to_string(),
            name: "Northern Mills".to_string(),
            contact_person: Some("  ".to_string()),
            phone: None,
            email: Some("orders@northern.example".to_string()),
            address: None,
            is_approved: true,
        }
    }

    fn existing_supplier(code: &str) -> Supplier {
        Supplier {
            id: SupplierId::new(),
            code: code.to_string(),
            name: "Other".to_string(),
            contact_person: None,
            phone: None,
            email: None,
            address: None,
            is_approved: false,
            audit_info: AuditInfo::default(),
        }
    }

    #[tokio::test]
    async fn test_create_supplier() {
        let mut uow = TestUow::default();
        uow.suppliers
            .expect_find_by_code()
            .with(eq("SUP-01"))
            .returning(|_| Ok(None));
        uow.suppliers
            .expect_save()
            .withf(|s| s.code == "SUP-01" && s.contact_person.is_none() && s.is_approved)
            .times(1)
            .returning(|_| Ok(()));
        let committed = uow.commit_flag();

        let handler = handler_with(uow);
        let id = handler
            .create_supplier(&Actor::anonymous(), supplier_input(" SUP-01 "))
            .await;
        assert!(id.is_ok());
        assert!(committed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_create_supplier_duplicate_code() {
        let mut uow = TestUow::default();
        uow.suppliers
            .expect_find_by_code()
            .returning(|code| Ok(Some(existing_supplier(code))));
        uow.suppliers.expect_save().never();
        let committed = uow.commit_flag();

        let handler = handler_with(uow);
        let err = handler
            .create_supplier(&Actor::anonymous(), supplier_input("SUP-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(!committed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_create_supplier_invalid_input_touches_nothing() {
        // 校验失败时不会开启工作单元，mock 上没有任何期望
        let handler = handler_with(TestUow::default());
        let mut input = supplier_input("SUP-01");
        input.name = String::new();
        let err = handler
            .create_supplier(&Actor::anonymous(), input)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_supplier_keeps_own_code() {
        let existing = existing_supplier("SUP-01");
        let id = existing.id;
        let mut uow = TestUow::default();
        let found = existing.clone();
        uow.suppliers
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        let same = existing.clone();
        uow.suppliers
            .expect_find_by_code()
            .returning(move |_| Ok(Some(same.clone())));
        uow.suppliers
            .expect_update()
            .withf(|s| s.name == "Northern Mills")
            .times(1)
            .returning(|_| Ok(()));

        let handler = handler_with(uow);
        handler
            .update_supplier(&Actor::anonymous(), &id, supplier_input("SUP-01"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_supplier() {
        let mut uow = TestUow::default();
        uow.suppliers.expect_find_by_id().returning(|_| Ok(None));
        uow.suppliers.expect_delete().never();

        let handler = handler_with(uow);
        let err = handler.delete_supplier(&SupplierId::new()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_raw_material_with_opening_stock() {
        let mut uow = TestUow::default();
        uow.raw_materials.expect_find_by_code().returning(|_| Ok(None));
        uow.raw_materials
            .expect_save()
            .withf(|m| m.unit == "KG" && m.quantity_in_stock.is_zero())
            .returning(|_| Ok(()));
        uow.stock
            .expect_apply_delta()
            .withf(|kind, _, delta| *kind == StockItemKind::RawMaterial && *delta == dec!(120))
            .times(1)
            .returning(|_, _, d| Ok(Some(Quantity::new(d).unwrap())));
        uow.stock
            .expect_record_movement()
            .withf(|m| m.reason == MovementReason::Adjustment)
            .times(1)
            .returning(|_| Ok(()));

        let handler = handler_with(uow);
        let input = RawMaterialInput {
            code: "RM-SUGAR".to_string(),
            name: "Sugar".to_string(),
            description: None,
            supplier_id: None,
            unit: "kg".to_string(),
            reorder_level: dec!(50),
            unit_cost: dec!(0.6),
            allergens: None,
            storage_conditions: Some("Dry".to_string()),
            opening_stock: Some(dec!(120)),
        };
        handler
            .create_raw_material(&Actor::anonymous(), input)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_raw_material_unknown_supplier() {
        let mut uow = TestUow::default();
        uow.suppliers.expect_find_by_id().returning(|_| Ok(None));
        uow.raw_materials.expect_save().never();

        let handler = handler_with(uow);
        let input = RawMaterialInput {
            code: "RM-SALT".to_string(),
            name: "Salt".to_string(),
            description: None,
            supplier_id: Some(SupplierId::new()),
            unit: "KG".to_string(),
            reorder_level: Decimal::ZERO,
            unit_cost: Decimal::ZERO,
            allergens: None,
            storage_conditions: None,
            opening_stock: None,
        };
        let err = handler
            .create_raw_material(&Actor::anonymous(), input)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_user_normalizes_username() {
        let mut uow = TestUow::default();
        uow.users
            .expect_find_by_username()
            .with(eq("qa.lead"))
            .returning(|_| Ok(None));
        uow.users
            .expect_save()
            .withf(|u| u.username == "qa.lead" && u.is_active)
            .returning(|_| Ok(()));

        let handler = handler_with(uow);
        let input = UserInput {
            username: "QA.Lead".to_string(),
            full_name: "Quality Lead".to_string(),
            email: None,
            role: crate::domain::enums::UserRole::QualityInspector,
            is_active: true,
        };
        handler.create_user(&Actor::anonymous(), input).await.unwrap();
    }
}
