//! 开票处理：发票与发票行

use foodtrace_common::{AuditInfo, PagedResult, Pagination};
use foodtrace_domain_core::Currency;
use foodtrace_errors::{AppError, AppResult};
use tracing::info;

use super::{ServiceHandler, clean, duplicate, found, positive_quantity, referenced, touch};
use crate::application::commands::*;
use crate::application::queries::InvoiceView;
use crate::domain::UnitOfWork;
use crate::domain::entities::{Invoice, InvoiceItem};
use crate::domain::enums::InvoiceStatus;
use crate::domain::repositories::InvoiceFilter;
use crate::domain::value_objects::{InvoiceId, InvoiceItemId};

async fn load_invoice(uow: &dyn UnitOfWork, id: &InvoiceId) -> AppResult<Invoice> {
    found(uow.invoices().find_by_id(id).await?, "Invoice", id)
}

/// 客户必须存在；关联发货单时须属于同一客户
async fn check_invoice_refs(uow: &dyn UnitOfWork, input: &InvoiceInput) -> AppResult<()> {
    referenced(
        uow.customers().find_by_id(&input.customer_id).await?,
        "Customer",
        input.customer_id,
    )?;
    if let Some(shipment_id) = &input.shipment_id {
        let shipment = referenced(
            uow.shipments().find_by_id(shipment_id).await?,
            "Shipment",
            shipment_id,
        )?;
        if shipment.customer_id != input.customer_id {
            return Err(AppError::validation(format!(
                "Shipment {} belongs to another customer",
                shipment.shipment_number
            )));
        }
    }
    Ok(())
}

fn currency_of(code: Option<String>) -> Currency {
    clean(code)
        .map(|c| Currency::new(&c))
        .unwrap_or_else(Currency::usd)
}

impl ServiceHandler {
    // ========== 发票 ==========

    pub async fn create_invoice(&self, actor: &Actor, input: InvoiceInput) -> AppResult<InvoiceId> {
        let uow = self.uow_factory.begin().await?;
        check_invoice_refs(uow.as_ref(), &input).await?;

        let invoice = Invoice {
            id: InvoiceId::new(),
            invoice_number: input.invoice_number.trim().to_string(),
            customer_id: input.customer_id,
            shipment_id: input.shipment_id,
            issue_date: input.issue_date,
            due_date: input.due_date,
            status: InvoiceStatus::Draft,
            currency: currency_of(input.currency),
            tax_rate: input.tax_rate,
            notes: clean(input.notes),
            items: Vec::new(),
            audit_info: AuditInfo::new(actor.user_id.clone()),
        };
        invoice.validate()?;

        if uow
            .invoices()
            .find_by_number(&invoice.invoice_number)
            .await?
            .is_some()
        {
            return Err(duplicate("Invoice", "number", &invoice.invoice_number));
        }
        uow.invoices().save(&invoice).await?;
        uow.commit().await?;

        info!(invoice_id = %invoice.id, invoice_number = %invoice.invoice_number, "Invoice created");
        Ok(invoice.id)
    }

    pub async fn get_invoice(&self, id: &InvoiceId) -> AppResult<InvoiceView> {
        let uow = self.uow_factory.read().await?;
        load_invoice(uow.as_ref(), id).await.map(InvoiceView::from)
    }

    pub async fn list_invoices(
        &self,
        filter: &InvoiceFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<InvoiceView>> {
        let uow = self.uow_factory.read().await?;
        let page = uow.invoices().list(filter, pagination).await?;
        Ok(page.map(InvoiceView::from))
    }

    /// 只能修改草稿
    pub async fn update_invoice(
        &self,
        actor: &Actor,
        id: &InvoiceId,
        input: InvoiceInput,
    ) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let mut invoice = load_invoice(uow.as_ref(), id).await?;
        invoice.ensure_draft()?;
        check_invoice_refs(uow.as_ref(), &input).await?;

        invoice.invoice_number = input.invoice_number.trim().to_string();
        invoice.customer_id = input.customer_id;
        invoice.shipment_id = input.shipment_id;
        invoice.issue_date = input.issue_date;
        invoice.due_date = input.due_date;
        invoice.currency = currency_of(input.currency);
        invoice.tax_rate = input.tax_rate;
        invoice.notes = clean(input.notes);
        invoice.validate()?;

        if let Some(other) = uow.invoices().find_by_number(&invoice.invoice_number).await? {
            if other.id != invoice.id {
                return Err(duplicate("Invoice", "number", &invoice.invoice_number));
            }
        }

        touch(&mut invoice, actor);
        uow.invoices().update(&invoice).await?;
        uow.commit().await?;

        info!(invoice_id = %id, "Invoice updated");
        Ok(())
    }

    pub async fn issue_invoice(&self, actor: &Actor, id: &InvoiceId) -> AppResult<()> {
        self.transition_invoice(actor, id, Invoice::issue, "issued").await
    }

    pub async fn pay_invoice(&self, actor: &Actor, id: &InvoiceId) -> AppResult<()> {
        self.transition_invoice(actor, id, Invoice::pay, "paid").await
    }

    pub async fn cancel_invoice(&self, actor: &Actor, id: &InvoiceId) -> AppResult<()> {
        self.transition_invoice(actor, id, Invoice::cancel, "cancelled").await
    }

    async fn transition_invoice(
        &self,
        actor: &Actor,
        id: &InvoiceId,
        transition: fn(&mut Invoice) -> AppResult<()>,
        label: &str,
    ) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let mut invoice = load_invoice(uow.as_ref(), id).await?;
        transition(&mut invoice)?;
        touch(&mut invoice, actor);
        uow.invoices().update(&invoice).await?;
        uow.commit().await?;

        info!(invoice_id = %id, total = %invoice.totals().total, "Invoice {}", label);
        Ok(())
    }

    /// 仅草稿或已取消的发票可删除
    pub async fn delete_invoice(&self, id: &InvoiceId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let invoice = load_invoice(uow.as_ref(), id).await?;
        invoice.ensure_deletable()?;
        uow.invoices().delete(id).await?;
        uow.commit().await?;

        info!(invoice_id = %id, invoice_number = %invoice.invoice_number, "Invoice deleted");
        Ok(())
    }

    // ========== 发票行 ==========

    /// 添加发票行；未给单价时取成品单价
    pub async fn add_invoice_item(
        &self,
        actor: &Actor,
        invoice_id: &InvoiceId,
        input: InvoiceItemInput,
    ) -> AppResult<InvoiceItemId> {
        let quantity = positive_quantity("Quantity", input.quantity)?;

        let uow = self.uow_factory.begin().await?;
        let mut invoice = load_invoice(uow.as_ref(), invoice_id).await?;
        invoice.ensure_draft()?;
        let product = referenced(
            uow.products().find_by_id(&input.product_id).await?,
            "Product",
            input.product_id,
        )?;

        let mut item = InvoiceItem {
            id: InvoiceItemId::new(),
            invoice_id: invoice.id,
            product_id: product.id,
            description: clean(input.description).or_else(|| Some(product.name.clone())),
            quantity,
            unit_price: input.unit_price.unwrap_or(product.unit_price),
            line_total: Default::default(),
            audit_info: AuditInfo::new(actor.user_id.clone()),
        };
        item.validate()?;
        item.recalculate(&invoice.currency)?;

        uow.invoices().save_item(&item).await?;
        touch(&mut invoice, actor);
        uow.invoices().update(&invoice).await?;
        uow.commit().await?;

        info!(invoice_id = %invoice_id, item_id = %item.id, line_total = %item.line_total, "Invoice item added");
        Ok(item.id)
    }

    pub async fn update_invoice_item(
        &self,
        actor: &Actor,
        invoice_id: &InvoiceId,
        item_id: &InvoiceItemId,
        input: InvoiceItemInput,
    ) -> AppResult<()> {
        let quantity = positive_quantity("Quantity", input.quantity)?;

        let uow = self.uow_factory.begin().await?;
        let mut invoice = load_invoice(uow.as_ref(), invoice_id).await?;
        invoice.ensure_draft()?;
        let mut item = item_of(uow.as_ref(), &invoice, item_id).await?;
        let product = referenced(
            uow.products().find_by_id(&input.product_id).await?,
            "Product",
            input.product_id,
        )?;

        item.product_id = product.id;
        item.description = clean(input.description).or_else(|| Some(product.name.clone()));
        item.quantity = quantity;
        item.unit_price = input.unit_price.unwrap_or(product.unit_price);
        item.validate()?;
        item.recalculate(&invoice.currency)?;

        touch(&mut item, actor);
        uow.invoices().update_item(&item).await?;
        touch(&mut invoice, actor);
        uow.invoices().update(&invoice).await?;
        uow.commit().await?;

        info!(invoice_id = %invoice_id, item_id = %item_id, "Invoice item updated");
        Ok(())
    }

    pub async fn remove_invoice_item(
        &self,
        actor: &Actor,
        invoice_id: &InvoiceId,
        item_id: &InvoiceItemId,
    ) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let mut invoice = load_invoice(uow.as_ref(), invoice_id).await?;
        invoice.ensure_draft()?;
        item_of(uow.as_ref(), &invoice, item_id).await?;

        uow.invoices().delete_item(item_id).await?;
        touch(&mut invoice, actor);
        uow.invoices().update(&invoice).await?;
        uow.commit().await?;

        info!(invoice_id = %invoice_id, item_id = %item_id, "Invoice item removed");
        Ok(())
    }
}

/// 发票行必须属于该发票
async fn item_of(
    uow: &dyn UnitOfWork,
    invoice: &Invoice,
    item_id: &InvoiceItemId,
) -> AppResult<InvoiceItem> {
    uow.invoices()
        .find_item(item_id)
        .await?
        .filter(|item| item.invoice_id == invoice.id)
        .ok_or_else(|| super::not_found("Invoice item", item_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{TestUow, handler_with};
    use crate::domain::entities::{Customer, FinishedProduct, Shipment};
    use crate::domain::enums::ShipmentStatus;
    use crate::domain::value_objects::{CustomerId, ProductId, ShipmentId};
    use chrono::NaiveDate;
    use foodtrace_domain_core::Quantity;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::Ordering;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn customer() -> Customer {
        Customer {
            id: CustomerId::new(),
            code: "CUS-01".to_string(),
            name: "Corner Grocery".to_string(),
            contact_person: None,
            phone: None,
            email: None,
            address: None,
            audit_info: AuditInfo::default(),
        }
    }

    fn invoice(status: InvoiceStatus) -> Invoice {
        Invoice {
            id: InvoiceId::new(),
            invoice_number: "INV-0001".to_string(),
            customer_id: CustomerId::new(),
            shipment_id: None,
            issue_date: date(1),
            due_date: date(31),
            status,
            currency: Currency::usd(),
            tax_rate: dec!(10),
            notes: None,
            items: vec![],
            audit_info: AuditInfo::default(),
        }
    }

    fn invoice_input(customer_id: CustomerId) -> InvoiceInput {
        InvoiceInput {
            invoice_number: "INV-0001".to_string(),
            customer_id,
            shipment_id: None,
            issue_date: date(1),
            due_date: date(31),
            currency: None,
            tax_rate: dec!(10),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_invoice_defaults_to_usd_draft() {
        let c = customer();
        let customer_id = c.id;
        let mut uow = TestUow::default();
        uow.customers
            .expect_find_by_id()
            .returning(move |_| Ok(Some(c.clone())));
        uow.invoices.expect_find_by_number().returning(|_| Ok(None));
        uow.invoices
            .expect_save()
            .withf(|i| i.status == InvoiceStatus::Draft && i.currency == Currency::usd())
            .times(1)
            .returning(|_| Ok(()));
        let committed = uow.commit_flag();

        handler_with(uow)
            .create_invoice(&Actor::anonymous(), invoice_input(customer_id))
            .await
            .unwrap();
        assert!(committed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_create_invoice_shipment_of_other_customer() {
        let c = customer();
        let customer_id = c.id;
        let mut uow = TestUow::default();
        uow.customers
            .expect_find_by_id()
            .returning(move |_| Ok(Some(c.clone())));
        uow.shipments.expect_find_by_id().returning(|id| {
            Ok(Some(Shipment {
                id: *id,
                shipment_number: "SH-9".to_string(),
                customer_id: CustomerId::new(),
                product_id: ProductId::new(),
                batch_id: None,
                quantity: Quantity::new(dec!(1)).unwrap(),
                shipment_date: date(1),
                status: ShipmentStatus::Shipped,
                carrier: None,
                tracking_number: None,
                notes: None,
                audit_info: AuditInfo::default(),
            }))
        });
        uow.invoices.expect_save().never();

        let mut input = invoice_input(customer_id);
        input.shipment_id = Some(ShipmentId::new());
        let err = handler_with(uow)
            .create_invoice(&Actor::anonymous(), input)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_issue_empty_invoice_fails() {
        let inv = invoice(InvoiceStatus::Draft);
        let id = inv.id;
        let mut uow = TestUow::default();
        uow.invoices
            .expect_find_by_id()
            .returning(move |_| Ok(Some(inv.clone())));
        uow.invoices.expect_update().never();

        let err = handler_with(uow)
            .issue_invoice(&Actor::anonymous(), &id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FailedPrecondition(_)));
    }

    #[tokio::test]
    async fn test_add_item_uses_product_price() {
        let inv = invoice(InvoiceStatus::Draft);
        let invoice_id = inv.id;
        let product = FinishedProduct {
            id: ProductId::new(),
            sku: "BRD-WHT".to_string(),
            name: "White bread".to_string(),
            description: None,
            unit: "loaf".to_string(),
            unit_price: dec!(2.35),
            quantity_in_stock: Quantity::zero(),
            shelf_life_days: None,
            audit_info: AuditInfo::default(),
        };
        let product_id = product.id;
        let mut uow = TestUow::default();
        uow.invoices
            .expect_find_by_id()
            .returning(move |_| Ok(Some(inv.clone())));
        uow.products
            .expect_find_by_id()
            .returning(move |_| Ok(Some(product.clone())));
        uow.invoices
            .expect_save_item()
            .withf(|item| {
                item.unit_price == dec!(2.35)
                    && item.line_total == dec!(7.76)
                    && item.description.as_deref() == Some("White bread")
            })
            .times(1)
            .returning(|_| Ok(()));
        uow.invoices.expect_update().times(1).returning(|_| Ok(()));

        handler_with(uow)
            .add_invoice_item(
                &Actor::anonymous(),
                &invoice_id,
                InvoiceItemInput {
                    product_id,
                    description: None,
                    quantity: dec!(3.3),
                    unit_price: None,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_add_item_to_issued_invoice() {
        let inv = invoice(InvoiceStatus::Issued);
        let invoice_id = inv.id;
        let mut uow = TestUow::default();
        uow.invoices
            .expect_find_by_id()
            .returning(move |_| Ok(Some(inv.clone())));
        uow.invoices.expect_save_item().never();

        let err = handler_with(uow)
            .add_invoice_item(
                &Actor::anonymous(),
                &invoice_id,
                InvoiceItemInput {
                    product_id: ProductId::new(),
                    description: None,
                    quantity: dec!(1),
                    unit_price: Some(dec!(1)),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FailedPrecondition(_)));
    }

    async fn add_item_at(quantity: Decimal, unit_price: Decimal) -> AppResult<InvoiceItemId> {
        let inv = invoice(InvoiceStatus::Draft);
        let invoice_id = inv.id;
        let product = FinishedProduct {
            id: ProductId::new(),
            sku: "BRD-RYE".to_string(),
            name: "Rye bread".to_string(),
            description: None,
            unit: "loaf".to_string(),
            unit_price: dec!(1),
            quantity_in_stock: Quantity::zero(),
            shelf_life_days: None,
            audit_info: AuditInfo::default(),
        };
        let product_id = product.id;
        let mut uow = TestUow::default();
        uow.invoices
            .expect_find_by_id()
            .returning(move |_| Ok(Some(inv.clone())));
        uow.products
            .expect_find_by_id()
            .returning(move |_| Ok(Some(product.clone())));
        uow.invoices.expect_save_item().never();
        uow.invoices.expect_update().never();

        handler_with(uow)
            .add_invoice_item(
                &Actor::anonymous(),
                &invoice_id,
                InvoiceItemInput {
                    product_id,
                    description: None,
                    quantity,
                    unit_price: Some(unit_price),
                },
            )
            .await
    }

    #[tokio::test]
    async fn test_add_item_with_oversized_amount_is_rejected() {
        // 行金额超出 NUMERIC(14, 2)
        let err = add_item_at(dec!(99999999999.999), dec!(9999999999.9999))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "{:?}", err);

        // 单价超出 NUMERIC(14, 4)
        let err = add_item_at(dec!(1), dec!(100000000000)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "{:?}", err);

        // 数量超出 NUMERIC(14, 3)
        let err = add_item_at(dec!(100000000000000000000), dec!(10000000000))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_remove_item_of_other_invoice_is_not_found() {
        let inv = invoice(InvoiceStatus::Draft);
        let invoice_id = inv.id;
        let mut uow = TestUow::default();
        uow.invoices
            .expect_find_by_id()
            .returning(move |_| Ok(Some(inv.clone())));
        uow.invoices.expect_find_item().returning(|id| {
            Ok(Some(InvoiceItem {
                id: *id,
                invoice_id: InvoiceId::new(),
                product_id: ProductId::new(),
                description: None,
                quantity: Quantity::new(dec!(1)).unwrap(),
                unit_price: dec!(1),
                line_total: dec!(1),
                audit_info: AuditInfo::default(),
            }))
        });
        uow.invoices.expect_delete_item().never();

        let err = handler_with(uow)
            .remove_invoice_item(&Actor::anonymous(), &invoice_id, &InvoiceItemId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_paid_invoice_is_refused() {
        let inv = invoice(InvoiceStatus::Paid);
        let id = inv.id;
        let mut uow = TestUow::default();
        uow.invoices
            .expect_find_by_id()
            .returning(move |_| Ok(Some(inv.clone())));
        uow.invoices.expect_delete().never();

        let err = handler_with(uow).delete_invoice(&id).await.unwrap_err();
        assert!(matches!(err, AppError::FailedPrecondition(_)));
    }
}
