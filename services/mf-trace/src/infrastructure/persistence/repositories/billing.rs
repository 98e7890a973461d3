//! 发票仓储
//!
//! 发票头与发票行分表存储，按 ID 或编号读取时一并加载发票行。

use async_trait::async_trait;
use foodtrace_adapter_postgres::run_in_session;
use foodtrace_common::{PagedResult, Pagination};
use foodtrace_errors::AppResult;
use std::collections::HashMap;
use uuid::Uuid;

use super::{define_pg_repo, locking, paged, window};
use crate::domain::entities::{Invoice, InvoiceItem};
use crate::domain::repositories::{InvoiceFilter, InvoiceRepository};
use crate::domain::value_objects::{InvoiceId, InvoiceItemId};
use crate::infrastructure::persistence::converters::{
    convert_all, invoice_from_row, invoice_item_from_row,
};
use crate::infrastructure::persistence::rows::{InvoiceItemRow, InvoiceRow};

macro_rules! invoice_columns {
    () => {
        "id, invoice_number, customer_id, shipment_id, issue_date, due_date, status, currency, \
         tax_rate, notes, created_at, created_by, updated_at, updated_by"
    };
}

macro_rules! item_columns {
    () => {
        "id, invoice_id, product_id, description, quantity, unit_price, line_total, \
         created_at, created_by, updated_at, updated_by"
    };
}

const FIND_INVOICE: &str = concat!("SELECT ", invoice_columns!(), " FROM invoices WHERE id = $1");
const FIND_INVOICE_FOR_UPDATE: &str = concat!(
    "SELECT ",
    invoice_columns!(),
    " FROM invoices WHERE id = $1 FOR UPDATE"
);

define_pg_repo!(PgInvoiceRepository);

impl PgInvoiceRepository {
    /// 加载多张发票的发票行，按发票分组
    async fn load_items(&self, invoice_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<InvoiceItem>>> {
        if invoice_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, InvoiceItemRow>(concat!(
                "SELECT ",
                item_columns!(),
                " FROM invoice_items WHERE invoice_id = ANY($1) ORDER BY created_at, id"
            ))
            .bind(invoice_ids)
            .fetch_all(conn)
        })?;

        let mut grouped: HashMap<Uuid, Vec<InvoiceItem>> = HashMap::new();
        for item in convert_all(rows, invoice_item_from_row)? {
            grouped.entry(item.invoice_id.0).or_default().push(item);
        }
        Ok(grouped)
    }

    async fn with_items(&self, row: Option<InvoiceRow>) -> AppResult<Option<Invoice>> {
        let Some(row) = row else {
            return Ok(None);
        };
        let mut invoice = invoice_from_row(row)?;
        let mut items = self.load_items(&[invoice.id.0]).await?;
        invoice.items = items.remove(&invoice.id.0).unwrap_or_default();
        Ok(Some(invoice))
    }
}

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    async fn find_by_id(&self, id: &InvoiceId) -> AppResult<Option<Invoice>> {
        let sql = locking(&self.session, FIND_INVOICE, FIND_INVOICE_FOR_UPDATE);
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, InvoiceRow>(sql)
                .bind(id.0)
                .fetch_optional(conn)
        })?;

        self.with_items(row).await
    }

    async fn find_by_number(&self, invoice_number: &str) -> AppResult<Option<Invoice>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, InvoiceRow>(concat!(
                "SELECT ",
                invoice_columns!(),
                " FROM invoices WHERE invoice_number = $1"
            ))
            .bind(invoice_number)
            .fetch_optional(conn)
        })?;

        self.with_items(row).await
    }

    /// 只写发票头，发票行通过 [`InvoiceRepository::save_item`] 写入
    async fn save(&self, invoice: &Invoice) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(concat!(
                "INSERT INTO invoices (",
                invoice_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
            ))
            .bind(invoice.id.0)
            .bind(&invoice.invoice_number)
            .bind(invoice.customer_id.0)
            .bind(invoice.shipment_id.map(|s| s.0))
            .bind(invoice.issue_date)
            .bind(invoice.due_date)
            .bind(i16::from(invoice.status))
            .bind(&invoice.currency.0)
            .bind(invoice.tax_rate)
            .bind(&invoice.notes)
            .bind(invoice.audit_info.created_at)
            .bind(invoice.audit_info.created_by.as_ref().map(|u| u.0))
            .bind(invoice.audit_info.updated_at)
            .bind(invoice.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn update(&self, invoice: &Invoice) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(
                r#"
                UPDATE invoices
                SET invoice_number = $2, customer_id = $3, shipment_id = $4, issue_date = $5,
                    due_date = $6, status = $7, currency = $8, tax_rate = $9, notes = $10,
                    updated_at = $11, updated_by = $12
                WHERE id = $1
                "#,
            )
            .bind(invoice.id.0)
            .bind(&invoice.invoice_number)
            .bind(invoice.customer_id.0)
            .bind(invoice.shipment_id.map(|s| s.0))
            .bind(invoice.issue_date)
            .bind(invoice.due_date)
            .bind(i16::from(invoice.status))
            .bind(&invoice.currency.0)
            .bind(invoice.tax_rate)
            .bind(&invoice.notes)
            .bind(invoice.audit_info.updated_at)
            .bind(invoice.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn delete(&self, id: &InvoiceId) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query("DELETE FROM invoices WHERE id = $1")
                .bind(id.0)
                .execute(conn)
        })?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &InvoiceFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<Invoice>> {
        let status = filter.status.map(i16::from);
        let customer_id = filter.customer_id.map(|c| c.0);
        let (limit, offset) = window(pagination);

        let (total,): (i64,) = run_in_session!(&self.session, |conn| {
            sqlx::query_as(
                "SELECT COUNT(*) FROM invoices \
                 WHERE ($1::smallint IS NULL OR status = $1) \
                   AND ($2::uuid IS NULL OR customer_id = $2)",
            )
            .bind(status)
            .bind(customer_id)
            .fetch_one(conn)
        })?;

        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, InvoiceRow>(concat!(
                "SELECT ",
                invoice_columns!(),
                " FROM invoices \
                 WHERE ($1::smallint IS NULL OR status = $1) \
                   AND ($2::uuid IS NULL OR customer_id = $2) \
                 ORDER BY issue_date DESC, invoice_number DESC LIMIT $3 OFFSET $4"
            ))
            .bind(status)
            .bind(customer_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(conn)
        })?;

        let mut invoices = convert_all(rows, invoice_from_row)?;
        let ids: Vec<Uuid> = invoices.iter().map(|i| i.id.0).collect();
        let mut items = self.load_items(&ids).await?;
        for invoice in &mut invoices {
            invoice.items = items.remove(&invoice.id.0).unwrap_or_default();
        }

        Ok(paged(invoices, total, pagination))
    }

    async fn find_item(&self, id: &InvoiceItemId) -> AppResult<Option<InvoiceItem>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, InvoiceItemRow>(concat!(
                "SELECT ",
                item_columns!(),
                " FROM invoice_items WHERE id = $1"
            ))
            .bind(id.0)
            .fetch_optional(conn)
        })?;

        row.map(invoice_item_from_row).transpose()
    }

    async fn save_item(&self, item: &InvoiceItem) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(concat!(
                "INSERT INTO invoice_items (",
                item_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
            ))
            .bind(item.id.0)
            .bind(item.invoice_id.0)
            .bind(item.product_id.0)
            .bind(&item.description)
            .bind(item.quantity.value())
            .bind(item.unit_price)
            .bind(item.line_total)
            .bind(item.audit_info.created_at)
            .bind(item.audit_info.created_by.as_ref().map(|u| u.0))
            .bind(item.audit_info.updated_at)
            .bind(item.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn update_item(&self, item: &InvoiceItem) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(
                r#"
                UPDATE invoice_items
                SET product_id = $2, description = $3, quantity = $4, unit_price = $5,
                    line_total = $6, updated_at = $7, updated_by = $8
                WHERE id = $1
                "#,
            )
            .bind(item.id.0)
            .bind(item.product_id.0)
            .bind(&item.description)
            .bind(item.quantity.value())
            .bind(item.unit_price)
            .bind(item.line_total)
            .bind(item.audit_info.updated_at)
            .bind(item.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn delete_item(&self, id: &InvoiceItemId) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query("DELETE FROM invoice_items WHERE id = $1")
                .bind(id.0)
                .execute(conn)
        })?;

        Ok(())
    }
}
