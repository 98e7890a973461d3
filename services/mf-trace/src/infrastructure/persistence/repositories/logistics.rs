//! 收货、发货与送货单仓储

use async_trait::async_trait;
use foodtrace_adapter_postgres::run_in_session;
use foodtrace_common::{PagedResult, Pagination};
use foodtrace_errors::AppResult;

use super::{define_pg_repo, locking, paged, window};
use crate::domain::entities::{DeliveryForm, ReceivingForm, Shipment};
use crate::domain::repositories::{
    DeliveryFormRepository, ReceivingFormFilter, ReceivingFormRepository, ShipmentFilter,
    ShipmentRepository,
};
use crate::domain::value_objects::{
    BatchId, DeliveryFormId, RawMaterialId, ReceivingFormId, ShipmentId,
};
use crate::infrastructure::persistence::converters::{
    convert_all, delivery_from_row, receiving_from_row, shipment_from_row,
};
use crate::infrastructure::persistence::rows::{DeliveryFormRow, ReceivingFormRow, ShipmentRow};

macro_rules! receiving_columns {
    () => {
        "id, form_number, supplier_id, raw_material_id, quantity, lot_number, received_at, \
         received_by, expiry_date, temperature_c, packaging_intact, accepted, rejection_reason, \
         notes, created_at, created_by, updated_at, updated_by"
    };
}

macro_rules! shipment_columns {
    () => {
        "id, shipment_number, customer_id, product_id, batch_id, quantity, shipment_date, \
         status, carrier, tracking_number, notes, created_at, created_by, updated_at, updated_by"
    };
}

macro_rules! delivery_columns {
    () => {
        "id, shipment_id, delivered_at, recipient_name, vehicle_number, driver_name, \
         temperature_c, condition, notes, created_at, created_by, updated_at, updated_by"
    };
}

const FIND_RECEIVING: &str = concat!(
    "SELECT ",
    receiving_columns!(),
    " FROM receiving_forms WHERE id = $1"
);
const FIND_RECEIVING_FOR_UPDATE: &str = concat!(
    "SELECT ",
    receiving_columns!(),
    " FROM receiving_forms WHERE id = $1 FOR UPDATE"
);

const FIND_SHIPMENT: &str = concat!("SELECT ", shipment_columns!(), " FROM shipments WHERE id = $1");
const FIND_SHIPMENT_FOR_UPDATE: &str = concat!(
    "SELECT ",
    shipment_columns!(),
    " FROM shipments WHERE id = $1 FOR UPDATE"
);

// ============================================================================
// ReceivingFormRepository 实现
// ============================================================================

define_pg_repo!(PgReceivingFormRepository);

#[async_trait]
impl ReceivingFormRepository for PgReceivingFormRepository {
    async fn find_by_id(&self, id: &ReceivingFormId) -> AppResult<Option<ReceivingForm>> {
        let sql = locking(&self.session, FIND_RECEIVING, FIND_RECEIVING_FOR_UPDATE);
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, ReceivingFormRow>(sql)
                .bind(id.0)
                .fetch_optional(conn)
        })?;

        row.map(receiving_from_row).transpose()
    }

    async fn find_by_number(&self, form_number: &str) -> AppResult<Option<ReceivingForm>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, ReceivingFormRow>(concat!(
                "SELECT ",
                receiving_columns!(),
                " FROM receiving_forms WHERE form_number = $1"
            ))
            .bind(form_number)
            .fetch_optional(conn)
        })?;

        row.map(receiving_from_row).transpose()
    }

    async fn save(&self, form: &ReceivingForm) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(concat!(
                "INSERT INTO receiving_forms (",
                receiving_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
            ))
            .bind(form.id.0)
            .bind(&form.form_number)
            .bind(form.supplier_id.0)
            .bind(form.raw_material_id.0)
            .bind(form.quantity.value())
            .bind(&form.lot_number)
            .bind(form.received_at)
            .bind(form.received_by.as_ref().map(|u| u.0))
            .bind(form.expiry_date)
            .bind(form.temperature_c)
            .bind(form.packaging_intact)
            .bind(form.accepted)
            .bind(&form.rejection_reason)
            .bind(&form.notes)
            .bind(form.audit_info.created_at)
            .bind(form.audit_info.created_by.as_ref().map(|u| u.0))
            .bind(form.audit_info.updated_at)
            .bind(form.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn update(&self, form: &ReceivingForm) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(
                r#"
                UPDATE receiving_forms
                SET form_number = $2, supplier_id = $3, raw_material_id = $4, quantity = $5,
                    lot_number = $6, received_at = $7, received_by = $8, expiry_date = $9,
                    temperature_c = $10, packaging_intact = $11, accepted = $12,
                    rejection_reason = $13, notes = $14, updated_at = $15, updated_by = $16
                WHERE id = $1
                "#,
            )
            .bind(form.id.0)
            .bind(&form.form_number)
            .bind(form.supplier_id.0)
            .bind(form.raw_material_id.0)
            .bind(form.quantity.value())
            .bind(&form.lot_number)
            .bind(form.received_at)
            .bind(form.received_by.as_ref().map(|u| u.0))
            .bind(form.expiry_date)
            .bind(form.temperature_c)
            .bind(form.packaging_intact)
            .bind(form.accepted)
            .bind(&form.rejection_reason)
            .bind(&form.notes)
            .bind(form.audit_info.updated_at)
            .bind(form.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn delete(&self, id: &ReceivingFormId) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query("DELETE FROM receiving_forms WHERE id = $1")
                .bind(id.0)
                .execute(conn)
        })?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &ReceivingFormFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ReceivingForm>> {
        let supplier_id = filter.supplier_id.map(|s| s.0);
        let raw_material_id = filter.raw_material_id.map(|m| m.0);
        let lot_number = filter
            .lot_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let (limit, offset) = window(pagination);

        let (total,): (i64,) = run_in_session!(&self.session, |conn| {
            sqlx::query_as(
                "SELECT COUNT(*) FROM receiving_forms \
                 WHERE ($1::uuid IS NULL OR supplier_id = $1) \
                   AND ($2::uuid IS NULL OR raw_material_id = $2) \
                   AND ($3::text IS NULL OR lot_number = $3)",
            )
            .bind(supplier_id)
            .bind(raw_material_id)
            .bind(lot_number)
            .fetch_one(conn)
        })?;

        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, ReceivingFormRow>(concat!(
                "SELECT ",
                receiving_columns!(),
                " FROM receiving_forms \
                 WHERE ($1::uuid IS NULL OR supplier_id = $1) \
                   AND ($2::uuid IS NULL OR raw_material_id = $2) \
                   AND ($3::text IS NULL OR lot_number = $3) \
                 ORDER BY received_at DESC, form_number DESC LIMIT $4 OFFSET $5"
            ))
            .bind(supplier_id)
            .bind(raw_material_id)
            .bind(lot_number)
            .bind(limit)
            .bind(offset)
            .fetch_all(conn)
        })?;

        Ok(paged(convert_all(rows, receiving_from_row)?, total, pagination))
    }

    async fn list_by_lot(
        &self,
        raw_material_id: &RawMaterialId,
        lot_number: &str,
    ) -> AppResult<Vec<ReceivingForm>> {
        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, ReceivingFormRow>(concat!(
                "SELECT ",
                receiving_columns!(),
                " FROM receiving_forms WHERE raw_material_id = $1 AND lot_number = $2 \
                 ORDER BY received_at, form_number"
            ))
            .bind(raw_material_id.0)
            .bind(lot_number)
            .fetch_all(conn)
        })?;

        convert_all(rows, receiving_from_row)
    }
}

// ============================================================================
// ShipmentRepository 实现
// ============================================================================

define_pg_repo!(PgShipmentRepository);

#[async_trait]
impl ShipmentRepository for PgShipmentRepository {
    async fn find_by_id(&self, id: &ShipmentId) -> AppResult<Option<Shipment>> {
        let sql = locking(&self.session, FIND_SHIPMENT, FIND_SHIPMENT_FOR_UPDATE);
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, ShipmentRow>(sql)
                .bind(id.0)
                .fetch_optional(conn)
        })?;

        row.map(shipment_from_row).transpose()
    }

    async fn find_by_number(&self, shipment_number: &str) -> AppResult<Option<Shipment>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, ShipmentRow>(concat!(
                "SELECT ",
                shipment_columns!(),
                " FROM shipments WHERE shipment_number = $1"
            ))
            .bind(shipment_number)
            .fetch_optional(conn)
        })?;

        row.map(shipment_from_row).transpose()
    }

    async fn save(&self, shipment: &Shipment) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(concat!(
                "INSERT INTO shipments (",
                shipment_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
            ))
            .bind(shipment.id.0)
            .bind(&shipment.shipment_number)
            .bind(shipment.customer_id.0)
            .bind(shipment.product_id.0)
            .bind(shipment.batch_id.map(|b| b.0))
            .bind(shipment.quantity.value())
            .bind(shipment.shipment_date)
            .bind(i16::from(shipment.status))
            .bind(&shipment.carrier)
            .bind(&shipment.tracking_number)
            .bind(&shipment.notes)
            .bind(shipment.audit_info.created_at)
            .bind(shipment.audit_info.created_by.as_ref().map(|u| u.0))
            .bind(shipment.audit_info.updated_at)
            .bind(shipment.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn update(&self, shipment: &Shipment) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(
                r#"
                UPDATE shipments
                SET shipment_number = $2, customer_id = $3, product_id = $4, batch_id = $5,
                    quantity = $6, shipment_date = $7, status = $8, carrier = $9,
                    tracking_number = $10, notes = $11, updated_at = $12, updated_by = $13
                WHERE id = $1
                "#,
            )
            .bind(shipment.id.0)
            .bind(&shipment.shipment_number)
            .bind(shipment.customer_id.0)
            .bind(shipment.product_id.0)
            .bind(shipment.batch_id.map(|b| b.0))
            .bind(shipment.quantity.value())
            .bind(shipment.shipment_date)
            .bind(i16::from(shipment.status))
            .bind(&shipment.carrier)
            .bind(&shipment.tracking_number)
            .bind(&shipment.notes)
            .bind(shipment.audit_info.updated_at)
            .bind(shipment.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn delete(&self, id: &ShipmentId) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query("DELETE FROM shipments WHERE id = $1")
                .bind(id.0)
                .execute(conn)
        })?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &ShipmentFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<Shipment>> {
        let status = filter.status.map(i16::from);
        let customer_id = filter.customer_id.map(|c| c.0);
        let batch_id = filter.batch_id.map(|b| b.0);
        let (limit, offset) = window(pagination);

        let (total,): (i64,) = run_in_session!(&self.session, |conn| {
            sqlx::query_as(
                "SELECT COUNT(*) FROM shipments \
                 WHERE ($1::smallint IS NULL OR status = $1) \
                   AND ($2::uuid IS NULL OR customer_id = $2) \
                   AND ($3::uuid IS NULL OR batch_id = $3)",
            )
            .bind(status)
            .bind(customer_id)
            .bind(batch_id)
            .fetch_one(conn)
        })?;

        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, ShipmentRow>(concat!(
                "SELECT ",
                shipment_columns!(),
                " FROM shipments \
                 WHERE ($1::smallint IS NULL OR status = $1) \
                   AND ($2::uuid IS NULL OR customer_id = $2) \
                   AND ($3::uuid IS NULL OR batch_id = $3) \
                 ORDER BY shipment_date DESC, shipment_number DESC LIMIT $4 OFFSET $5"
            ))
            .bind(status)
            .bind(customer_id)
            .bind(batch_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(conn)
        })?;

        Ok(paged(convert_all(rows, shipment_from_row)?, total, pagination))
    }

    async fn list_by_batch(&self, batch_id: &BatchId) -> AppResult<Vec<Shipment>> {
        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, ShipmentRow>(concat!(
                "SELECT ",
                shipment_columns!(),
                " FROM shipments WHERE batch_id = $1 ORDER BY shipment_date, shipment_number"
            ))
            .bind(batch_id.0)
            .fetch_all(conn)
        })?;

        convert_all(rows, shipment_from_row)
    }
}

// ============================================================================
// DeliveryFormRepository 实现
// ============================================================================

define_pg_repo!(PgDeliveryFormRepository);

#[async_trait]
impl DeliveryFormRepository for PgDeliveryFormRepository {
    async fn find_by_id(&self, id: &DeliveryFormId) -> AppResult<Option<DeliveryForm>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, DeliveryFormRow>(concat!(
                "SELECT ",
                delivery_columns!(),
                " FROM delivery_forms WHERE id = $1"
            ))
            .bind(id.0)
            .fetch_optional(conn)
        })?;

        row.map(delivery_from_row).transpose()
    }

    async fn find_by_shipment(
        &self,
        shipment_id: &ShipmentId,
    ) -> AppResult<Option<DeliveryForm>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, DeliveryFormRow>(concat!(
                "SELECT ",
                delivery_columns!(),
                " FROM delivery_forms WHERE shipment_id = $1"
            ))
            .bind(shipment_id.0)
            .fetch_optional(conn)
        })?;

        row.map(delivery_from_row).transpose()
    }

    async fn save(&self, form: &DeliveryForm) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(concat!(
                "INSERT INTO delivery_forms (",
                delivery_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
            ))
            .bind(form.id.0)
            .bind(form.shipment_id.0)
            .bind(form.delivered_at)
            .bind(&form.recipient_name)
            .bind(&form.vehicle_number)
            .bind(&form.driver_name)
            .bind(form.temperature_c)
            .bind(i16::from(form.condition))
            .bind(&form.notes)
            .bind(form.audit_info.created_at)
            .bind(form.audit_info.created_by.as_ref().map(|u| u.0))
            .bind(form.audit_info.updated_at)
            .bind(form.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn update(&self, form: &DeliveryForm) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(
                r#"
                UPDATE delivery_forms
                SET delivered_at = $2, recipient_name = $3, vehicle_number = $4, driver_name = $5,
                    temperature_c = $6, condition = $7, notes = $8,
                    updated_at = $9, updated_by = $10
                WHERE id = $1
                "#,
            )
            .bind(form.id.0)
            .bind(form.delivered_at)
            .bind(&form.recipient_name)
            .bind(&form.vehicle_number)
            .bind(&form.driver_name)
            .bind(form.temperature_c)
            .bind(i16::from(form.condition))
            .bind(&form.notes)
            .bind(form.audit_info.updated_at)
            .bind(form.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn delete(&self, id: &DeliveryFormId) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query("DELETE FROM delivery_forms WHERE id = $1")
                .bind(id.0)
                .execute(conn)
        })?;

        Ok(())
    }
}
