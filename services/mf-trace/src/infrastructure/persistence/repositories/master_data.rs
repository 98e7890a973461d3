//! 主数据仓储

use async_trait::async_trait;
use foodtrace_adapter_postgres::run_in_session;
use foodtrace_common::{PagedResult, Pagination, UserId};
use foodtrace_domain_core::Quantity;
use foodtrace_errors::AppResult;

use super::{define_pg_repo, paged, search_term, window};
use crate::domain::entities::{Customer, FinishedProduct, RawMaterial, Supplier, User};
use crate::domain::repositories::{
    CustomerRepository, FinishedProductRepository, RawMaterialFilter, RawMaterialRepository,
    SupplierRepository, TextFilter, UserFilter, UserRepository,
};
use crate::domain::value_objects::{CustomerId, ProductId, RawMaterialId, SupplierId};
use crate::infrastructure::persistence::converters::{
    convert_all, customer_from_row, product_from_row, raw_material_from_row, supplier_from_row,
    user_from_row,
};
use crate::infrastructure::persistence::rows::{
    CustomerRow, FinishedProductRow, RawMaterialRow, SupplierRow, UserRow,
};

macro_rules! supplier_columns {
    () => {
        "id, code, name, contact_person, phone, email, address, is_approved, \
         created_at, created_by, updated_at, updated_by"
    };
}

macro_rules! raw_material_columns {
    () => {
        "id, code, name, description, supplier_id, unit, quantity_in_stock, reorder_level, \
         unit_cost, allergens, storage_conditions, created_at, created_by, updated_at, updated_by"
    };
}

macro_rules! product_columns {
    () => {
        "id, sku, name, description, unit, unit_price, quantity_in_stock, shelf_life_days, \
         created_at, created_by, updated_at, updated_by"
    };
}

macro_rules! customer_columns {
    () => {
        "id, code, name, contact_person, phone, email, address, \
         created_at, created_by, updated_at, updated_by"
    };
}

macro_rules! user_columns {
    () => {
        "id, username, full_name, email, role, is_active, \
         created_at, created_by, updated_at, updated_by"
    };
}

// ============================================================================
// SupplierRepository 实现
// ============================================================================

define_pg_repo!(PgSupplierRepository);

#[async_trait]
impl SupplierRepository for PgSupplierRepository {
    async fn find_by_id(&self, id: &SupplierId) -> AppResult<Option<Supplier>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, SupplierRow>(concat!(
                "SELECT ",
                supplier_columns!(),
                " FROM suppliers WHERE id = $1"
            ))
            .bind(id.0)
            .fetch_optional(conn)
        })?;

        row.map(supplier_from_row).transpose()
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Supplier>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, SupplierRow>(concat!(
                "SELECT ",
                supplier_columns!(),
                " FROM suppliers WHERE code = $1"
            ))
            .bind(code)
            .fetch_optional(conn)
        })?;

        row.map(supplier_from_row).transpose()
    }

    async fn save(&self, supplier: &Supplier) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(concat!(
                "INSERT INTO suppliers (",
                supplier_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
            ))
            .bind(supplier.id.0)
            .bind(&supplier.code)
            .bind(&supplier.name)
            .bind(&supplier.contact_person)
            .bind(&supplier.phone)
            .bind(&supplier.email)
            .bind(&supplier.address)
            .bind(supplier.is_approved)
            .bind(supplier.audit_info.created_at)
            .bind(supplier.audit_info.created_by.as_ref().map(|u| u.0))
            .bind(supplier.audit_info.updated_at)
            .bind(supplier.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn update(&self, supplier: &Supplier) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(
                r#"
                UPDATE suppliers
                SET code = $2, name = $3, contact_person = $4, phone = $5, email = $6,
                    address = $7, is_approved = $8, updated_at = $9, updated_by = $10
                WHERE id = $1
                "#,
            )
            .bind(supplier.id.0)
            .bind(&supplier.code)
            .bind(&supplier.name)
            .bind(&supplier.contact_person)
            .bind(&supplier.phone)
            .bind(&supplier.email)
            .bind(&supplier.address)
            .bind(supplier.is_approved)
            .bind(supplier.audit_info.updated_at)
            .bind(supplier.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn delete(&self, id: &SupplierId) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query("DELETE FROM suppliers WHERE id = $1")
                .bind(id.0)
                .execute(conn)
        })?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &TextFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<Supplier>> {
        let q = search_term(&filter.q);
        let (limit, offset) = window(pagination);

        let (total,): (i64,) = run_in_session!(&self.session, |conn| {
            sqlx::query_as(
                "SELECT COUNT(*) FROM suppliers \
                 WHERE ($1::text IS NULL OR code ILIKE $1 OR name ILIKE $1)",
            )
            .bind(&q)
            .fetch_one(conn)
        })?;

        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, SupplierRow>(concat!(
                "SELECT ",
                supplier_columns!(),
                " FROM suppliers WHERE ($1::text IS NULL OR code ILIKE $1 OR name ILIKE $1) \
                 ORDER BY code LIMIT $2 OFFSET $3"
            ))
            .bind(&q)
            .bind(limit)
            .bind(offset)
            .fetch_all(conn)
        })?;

        Ok(paged(convert_all(rows, supplier_from_row)?, total, pagination))
    }
}

// ============================================================================
// RawMaterialRepository 实现
// ============================================================================

define_pg_repo!(PgRawMaterialRepository);

#[async_trait]
impl RawMaterialRepository for PgRawMaterialRepository {
    async fn find_by_id(&self, id: &RawMaterialId) -> AppResult<Option<RawMaterial>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, RawMaterialRow>(concat!(
                "SELECT ",
                raw_material_columns!(),
                " FROM raw_materials WHERE id = $1"
            ))
            .bind(id.0)
            .fetch_optional(conn)
        })?;

        row.map(raw_material_from_row).transpose()
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<RawMaterial>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, RawMaterialRow>(concat!(
                "SELECT ",
                raw_material_columns!(),
                " FROM raw_materials WHERE code = $1"
            ))
            .bind(code)
            .fetch_optional(conn)
        })?;

        row.map(raw_material_from_row).transpose()
    }

    async fn save(&self, material: &RawMaterial) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(concat!(
                "INSERT INTO raw_materials (",
                raw_material_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
            ))
            .bind(material.id.0)
            .bind(&material.code)
            .bind(&material.name)
            .bind(&material.description)
            .bind(material.supplier_id.map(|s| s.0))
            .bind(&material.unit)
            .bind(material.quantity_in_stock.value())
            .bind(material.reorder_level.value())
            .bind(material.unit_cost)
            .bind(&material.allergens)
            .bind(&material.storage_conditions)
            .bind(material.audit_info.created_at)
            .bind(material.audit_info.created_by.as_ref().map(|u| u.0))
            .bind(material.audit_info.updated_at)
            .bind(material.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    /// 库存列只经由库存仓储修改，这里不写 quantity_in_stock
    async fn update(&self, material: &RawMaterial) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(
                r#"
                UPDATE raw_materials
                SET code = $2, name = $3, description = $4, supplier_id = $5, unit = $6,
                    reorder_level = $7, unit_cost = $8, allergens = $9, storage_conditions = $10,
                    updated_at = $11, updated_by = $12
                WHERE id = $1
                "#,
            )
            .bind(material.id.0)
            .bind(&material.code)
            .bind(&material.name)
            .bind(&material.description)
            .bind(material.supplier_id.map(|s| s.0))
            .bind(&material.unit)
            .bind(material.reorder_level.value())
            .bind(material.unit_cost)
            .bind(&material.allergens)
            .bind(&material.storage_conditions)
            .bind(material.audit_info.updated_at)
            .bind(material.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn delete(&self, id: &RawMaterialId) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query("DELETE FROM raw_materials WHERE id = $1")
                .bind(id.0)
                .execute(conn)
        })?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &RawMaterialFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<RawMaterial>> {
        let q = search_term(&filter.q);
        let supplier_id = filter.supplier_id.map(|s| s.0);
        let (limit, offset) = window(pagination);

        let (total,): (i64,) = run_in_session!(&self.session, |conn| {
            sqlx::query_as(
                "SELECT COUNT(*) FROM raw_materials \
                 WHERE ($1::text IS NULL OR code ILIKE $1 OR name ILIKE $1) \
                   AND ($2::uuid IS NULL OR supplier_id = $2)",
            )
            .bind(&q)
            .bind(supplier_id)
            .fetch_one(conn)
        })?;

        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, RawMaterialRow>(concat!(
                "SELECT ",
                raw_material_columns!(),
                " FROM raw_materials \
                 WHERE ($1::text IS NULL OR code ILIKE $1 OR name ILIKE $1) \
                   AND ($2::uuid IS NULL OR supplier_id = $2) \
                 ORDER BY code LIMIT $3 OFFSET $4"
            ))
            .bind(&q)
            .bind(supplier_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(conn)
        })?;

        Ok(paged(convert_all(rows, raw_material_from_row)?, total, pagination))
    }

    async fn list_low_stock(&self) -> AppResult<Vec<RawMaterial>> {
        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, RawMaterialRow>(concat!(
                "SELECT ",
                raw_material_columns!(),
                " FROM raw_materials WHERE quantity_in_stock <= reorder_level \
                 ORDER BY quantity_in_stock, code"
            ))
            .fetch_all(conn)
        })?;

        convert_all(rows, raw_material_from_row)
    }
}

// ============================================================================
// FinishedProductRepository 实现
// ============================================================================

define_pg_repo!(PgFinishedProductRepository);

#[async_trait]
impl FinishedProductRepository for PgFinishedProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> AppResult<Option<FinishedProduct>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, FinishedProductRow>(concat!(
                "SELECT ",
                product_columns!(),
                " FROM finished_products WHERE id = $1"
            ))
            .bind(id.0)
            .fetch_optional(conn)
        })?;

        row.map(product_from_row).transpose()
    }

    async fn find_by_sku(&self, sku: &str) -> AppResult<Option<FinishedProduct>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, FinishedProductRow>(concat!(
                "SELECT ",
                product_columns!(),
                " FROM finished_products WHERE sku = $1"
            ))
            .bind(sku)
            .fetch_optional(conn)
        })?;

        row.map(product_from_row).transpose()
    }

    async fn save(&self, product: &FinishedProduct) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(concat!(
                "INSERT INTO finished_products (",
                product_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
            ))
            .bind(product.id.0)
            .bind(&product.sku)
            .bind(&product.name)
            .bind(&product.description)
            .bind(&product.unit)
            .bind(product.unit_price)
            .bind(product.quantity_in_stock.value())
            .bind(product.shelf_life_days)
            .bind(product.audit_info.created_at)
            .bind(product.audit_info.created_by.as_ref().map(|u| u.0))
            .bind(product.audit_info.updated_at)
            .bind(product.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn update(&self, product: &FinishedProduct) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(
                r#"
                UPDATE finished_products
                SET sku = $2, name = $3, description = $4, unit = $5, unit_price = $6,
                    shelf_life_days = $7, updated_at = $8, updated_by = $9
                WHERE id = $1
                "#,
            )
            .bind(product.id.0)
            .bind(&product.sku)
            .bind(&product.name)
            .bind(&product.description)
            .bind(&product.unit)
            .bind(product.unit_price)
            .bind(product.shelf_life_days)
            .bind(product.audit_info.updated_at)
            .bind(product.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn delete(&self, id: &ProductId) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query("DELETE FROM finished_products WHERE id = $1")
                .bind(id.0)
                .execute(conn)
        })?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &TextFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<FinishedProduct>> {
        let q = search_term(&filter.q);
        let (limit, offset) = window(pagination);

        let (total,): (i64,) = run_in_session!(&self.session, |conn| {
            sqlx::query_as(
                "SELECT COUNT(*) FROM finished_products \
                 WHERE ($1::text IS NULL OR sku ILIKE $1 OR name ILIKE $1)",
            )
            .bind(&q)
            .fetch_one(conn)
        })?;

        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, FinishedProductRow>(concat!(
                "SELECT ",
                product_columns!(),
                " FROM finished_products WHERE ($1::text IS NULL OR sku ILIKE $1 OR name ILIKE $1) \
                 ORDER BY sku LIMIT $2 OFFSET $3"
            ))
            .bind(&q)
            .bind(limit)
            .bind(offset)
            .fetch_all(conn)
        })?;

        Ok(paged(convert_all(rows, product_from_row)?, total, pagination))
    }

    async fn list_low_stock(&self, threshold: Quantity) -> AppResult<Vec<FinishedProduct>> {
        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, FinishedProductRow>(concat!(
                "SELECT ",
                product_columns!(),
                " FROM finished_products WHERE quantity_in_stock <= $1 \
                 ORDER BY quantity_in_stock, sku"
            ))
            .bind(threshold.value())
            .fetch_all(conn)
        })?;

        convert_all(rows, product_from_row)
    }
}

// ============================================================================
// CustomerRepository 实现
// ============================================================================

define_pg_repo!(PgCustomerRepository);

#[async_trait]
impl CustomerRepository for PgCustomerRepository {
    async fn find_by_id(&self, id: &CustomerId) -> AppResult<Option<Customer>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, CustomerRow>(concat!(
                "SELECT ",
                customer_columns!(),
                " FROM customers WHERE id = $1"
            ))
            .bind(id.0)
            .fetch_optional(conn)
        })?;

        row.map(customer_from_row).transpose()
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Customer>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, CustomerRow>(concat!(
                "SELECT ",
                customer_columns!(),
                " FROM customers WHERE code = $1"
            ))
            .bind(code)
            .fetch_optional(conn)
        })?;

        row.map(customer_from_row).transpose()
    }

    async fn save(&self, customer: &Customer) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(concat!(
                "INSERT INTO customers (",
                customer_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
            ))
            .bind(customer.id.0)
            .bind(&customer.code)
            .bind(&customer.name)
            .bind(&customer.contact_person)
            .bind(&customer.phone)
            .bind(&customer.email)
            .bind(&customer.address)
            .bind(customer.audit_info.created_at)
            .bind(customer.audit_info.created_by.as_ref().map(|u| u.0))
            .bind(customer.audit_info.updated_at)
            .bind(customer.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn update(&self, customer: &Customer) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(
                r#"
                UPDATE customers
                SET code = $2, name = $3, contact_person = $4, phone = $5, email = $6,
                    address = $7, updated_at = $8, updated_by = $9
                WHERE id = $1
                "#,
            )
            .bind(customer.id.0)
            .bind(&customer.code)
            .bind(&customer.name)
            .bind(&customer.contact_person)
            .bind(&customer.phone)
            .bind(&customer.email)
            .bind(&customer.address)
            .bind(customer.audit_info.updated_at)
            .bind(customer.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn delete(&self, id: &CustomerId) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query("DELETE FROM customers WHERE id = $1")
                .bind(id.0)
                .execute(conn)
        })?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &TextFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<Customer>> {
        let q = search_term(&filter.q);
        let (limit, offset) = window(pagination);

        let (total,): (i64,) = run_in_session!(&self.session, |conn| {
            sqlx::query_as(
                "SELECT COUNT(*) FROM customers \
                 WHERE ($1::text IS NULL OR code ILIKE $1 OR name ILIKE $1)",
            )
            .bind(&q)
            .fetch_one(conn)
        })?;

        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, CustomerRow>(concat!(
                "SELECT ",
                customer_columns!(),
                " FROM customers WHERE ($1::text IS NULL OR code ILIKE $1 OR name ILIKE $1) \
                 ORDER BY code LIMIT $2 OFFSET $3"
            ))
            .bind(&q)
            .bind(limit)
            .bind(offset)
            .fetch_all(conn)
        })?;

        Ok(paged(convert_all(rows, customer_from_row)?, total, pagination))
    }
}

// ============================================================================
// UserRepository 实现
// ============================================================================

define_pg_repo!(PgUserRepository);

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, UserRow>(concat!(
                "SELECT ",
                user_columns!(),
                " FROM users WHERE id = $1"
            ))
            .bind(id.0)
            .fetch_optional(conn)
        })?;

        row.map(user_from_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, UserRow>(concat!(
                "SELECT ",
                user_columns!(),
                " FROM users WHERE username = $1"
            ))
            .bind(username)
            .fetch_optional(conn)
        })?;

        row.map(user_from_row).transpose()
    }

    async fn save(&self, user: &User) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(concat!(
                "INSERT INTO users (",
                user_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
            ))
            .bind(user.id.0)
            .bind(&user.username)
            .bind(&user.full_name)
            .bind(&user.email)
            .bind(i16::from(user.role))
            .bind(user.is_active)
            .bind(user.audit_info.created_at)
            .bind(user.audit_info.created_by.as_ref().map(|u| u.0))
            .bind(user.audit_info.updated_at)
            .bind(user.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(
                r#"
                UPDATE users
                SET username = $2, full_name = $3, email = $4, role = $5, is_active = $6,
                    updated_at = $7, updated_by = $8
                WHERE id = $1
                "#,
            )
            .bind(user.id.0)
            .bind(&user.username)
            .bind(&user.full_name)
            .bind(&user.email)
            .bind(i16::from(user.role))
            .bind(user.is_active)
            .bind(user.audit_info.updated_at)
            .bind(user.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn delete(&self, id: &UserId) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id.0)
                .execute(conn)
        })?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &UserFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<User>> {
        let q = search_term(&filter.q);
        let role = filter.role.map(i16::from);
        let (limit, offset) = window(pagination);

        let (total,): (i64,) = run_in_session!(&self.session, |conn| {
            sqlx::query_as(
                "SELECT COUNT(*) FROM users \
                 WHERE ($1::text IS NULL OR username ILIKE $1 OR full_name ILIKE $1) \
                   AND ($2::smallint IS NULL OR role = $2) \
                   AND (NOT $3 OR is_active)",
            )
            .bind(&q)
            .bind(role)
            .bind(filter.active_only)
            .fetch_one(conn)
        })?;

        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, UserRow>(concat!(
                "SELECT ",
                user_columns!(),
                " FROM users \
                 WHERE ($1::text IS NULL OR username ILIKE $1 OR full_name ILIKE $1) \
                   AND ($2::smallint IS NULL OR role = $2) \
                   AND (NOT $3 OR is_active) \
                 ORDER BY username LIMIT $4 OFFSET $5"
            ))
            .bind(&q)
            .bind(role)
            .bind(filter.active_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(conn)
        })?;

        Ok(paged(convert_all(rows, user_from_row)?, total, pagination))
    }
}
