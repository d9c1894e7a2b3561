//! Shared fixture for repository tests.
//!
//! Every test gets a fresh in-memory database holding one garment ("BODY")
//! with two variants and one active customer.

use crate::pool::{Database, DbConfig};
use crate::repository::catalog::new_garment;
use crate::repository::customer::new_customer;
use atelier_core::{
    Customer, DocumentType, NewReturn, NewReturnItem, NewSale, NewSaleItem, ReturnReason,
    SaleDetail, SaleStatus, Variant,
};

pub(crate) struct Fixture {
    pub db: Database,
    pub category_id: String,
    pub customer: Customer,
    /// White 0-3m, stock 10.
    pub variant_a: Variant,
    /// Pink 0-3m, stock 5.
    pub variant_b: Variant,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_config(DbConfig::in_memory()).await
    }

    /// Same catalog and customer on a caller-supplied database.
    pub async fn with_config(config: DbConfig) -> Self {
        let db = Database::new(config).await.unwrap();
        let catalog = db.catalog();

        let category = catalog.insert_category("Bodysuits", None).await.unwrap();
        let size = catalog.insert_size("0-3m", 1).await.unwrap();
        let white = catalog.insert_color("White", Some("#FFFFFF")).await.unwrap();
        let pink = catalog.insert_color("Pink", Some("#F4C2C2")).await.unwrap();

        let garment = catalog
            .insert_garment(&new_garment("body", "Cotton bodysuit", category.id.clone(), 4_000, 10_000))
            .await
            .unwrap();

        let variant_a = catalog
            .insert_variant(&garment.id, &size.id, &white.id, 10)
            .await
            .unwrap();
        let variant_b = catalog
            .insert_variant(&garment.id, &size.id, &pink.id, 5)
            .await
            .unwrap();

        let customer = db
            .customers()
            .insert(&new_customer("Ana", "Paz", DocumentType::Dni, Some("30111222".into())))
            .await
            .unwrap();

        Fixture {
            db,
            category_id: category.id,
            customer,
            variant_a,
            variant_b,
        }
    }

    /// A pending sale payload for the fixture customer.
    pub fn new_sale(&self, items: Vec<NewSaleItem>) -> NewSale {
        NewSale {
            customer_id: self.customer.id.clone(),
            sale_date: None,
            discount_cents: 0,
            tax_cents: 0,
            status: None,
            payment_method: Default::default(),
            notes: None,
            seller: None,
            items,
        }
    }

    /// Creates a paid single-line sale.
    pub async fn sell(&self, variant_id: &str, quantity: i64, unit_price_cents: i64) -> SaleDetail {
        let mut new_sale = self.new_sale(vec![line(variant_id, quantity, unit_price_cents)]);
        new_sale.status = Some(SaleStatus::Paid);
        self.db.sales().create_sale(&new_sale).await.unwrap()
    }

    pub fn new_return(&self, sale_id: &str, items: Vec<NewReturnItem>) -> NewReturn {
        NewReturn {
            sale_id: sale_id.to_string(),
            return_date: None,
            reason: ReturnReason::WrongSize,
            description: None,
            refunded_cents: None,
            processed_by: None,
            items,
        }
    }

    pub async fn stock_of(&self, variant_id: &str) -> i64 {
        self.db.stock().get_stock(variant_id).await.unwrap()
    }
}

pub(crate) fn line(variant_id: &str, quantity: i64, unit_price_cents: i64) -> NewSaleItem {
    NewSaleItem {
        variant_id: variant_id.to_string(),
        quantity,
        unit_price_cents,
        item_discount_cents: 0,
    }
}

pub(crate) fn return_line(sale_item_id: &str, quantity: i64, refund_cents: i64) -> NewReturnItem {
    NewReturnItem {
        sale_item_id: sale_item_id.to_string(),
        quantity,
        refund_cents,
    }
}
