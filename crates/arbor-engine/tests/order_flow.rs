//! End-to-end order lifecycle tests: submission, pricing, stock mutation,
//! failure atomicity, coupon consumption, and notification dispatch against
//! an in-memory database.

use std::sync::Arc;

use chrono::{Duration, Utc};

use arbor_core::{
    Addon, CatalogItem, Coupon, CouponRejection, DiscountType, ItemKind, OrderSource, OrderStatus,
    PaymentMethod, StockLocator, Tax, TaxType, Variant, VariantSize,
};
use arbor_db::{Database, DbConfig};
use arbor_engine::{
    CustomerInfo, EngineError, NotificationDispatcher, NotifyError, OrderCoordinator,
    OrderLineRequest, OrderRequest, OrderSnapshot, SequenceGenerator,
};

// =============================================================================
// Fixtures
// =============================================================================

async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

fn coordinator(db: &Database) -> OrderCoordinator {
    OrderCoordinator::new(db.clone()).with_ids(Arc::new(SequenceGenerator::new("id")))
}

fn catalog_item(id: &str, kind: ItemKind, category: &str, price_cents: i64, stock: i64) -> CatalogItem {
    let now = Utc::now();
    CatalogItem {
        id: id.to_string(),
        kind,
        sku: id.to_uppercase(),
        name: format!("{id} item"),
        category: category.to_string(),
        unit: "piece".to_string(),
        unit_price_cents: price_cents,
        stock,
        has_variants: false,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// Seeds a product with one color ("Walnut") and one size; returns the
/// variant (color) id used in requests.
async fn seed_variant_product(
    db: &Database,
    id: &str,
    category: &str,
    price_cents: i64,
    size_name: &str,
    stock: i64,
) -> String {
    let now = Utc::now();
    let mut product = catalog_item(id, ItemKind::Product, category, price_cents, 0);
    product.has_variants = true;
    db.catalog().insert_item(&product).await.unwrap();

    let variant = Variant {
        id: format!("{id}-walnut"),
        product_id: id.to_string(),
        color_name: "Walnut".to_string(),
        color_code: None,
        created_at: now,
    };
    db.catalog().insert_variant(&variant).await.unwrap();

    let size = VariantSize {
        id: format!("{id}-walnut-{size_name}"),
        variant_id: variant.id.clone(),
        size_name: size_name.to_string(),
        stock,
        width_cm: Some(180.0),
        height_cm: Some(75.0),
        depth_cm: Some(90.0),
        created_at: now,
    };
    db.catalog().insert_size(id, &size).await.unwrap();

    variant.id
}

fn percentage_coupon(id: &str, code: &str, percent_bps: u32, cap_cents: Option<i64>) -> Coupon {
    let now = Utc::now();
    Coupon {
        id: id.to_string(),
        code: code.to_string(),
        discount_type: DiscountType::Percentage,
        percent_bps: Some(percent_bps),
        amount_cents: None,
        minimum_amount_cents: 0,
        max_discount_cents: cap_cents,
        usage_limit: Some(10),
        used_count: 0,
        valid_from: now - Duration::days(1),
        valid_to: now + Duration::days(30),
        is_active: true,
        created_at: now,
    }
}

fn fixed_coupon(id: &str, code: &str, amount_cents: i64, minimum_cents: i64) -> Coupon {
    let now = Utc::now();
    Coupon {
        id: id.to_string(),
        code: code.to_string(),
        discount_type: DiscountType::Fixed,
        percent_bps: None,
        amount_cents: Some(amount_cents),
        minimum_amount_cents: minimum_cents,
        max_discount_cents: None,
        usage_limit: None,
        used_count: 0,
        valid_from: now - Duration::days(1),
        valid_to: now + Duration::days(30),
        is_active: true,
        created_at: now,
    }
}

fn tax(id: &str, rate_bps: u32, tax_type: TaxType, categories: &[&str]) -> Tax {
    Tax {
        id: id.to_string(),
        name: id.to_string(),
        rate_bps,
        tax_type,
        applicable_categories: categories.iter().map(|s| s.to_string()).collect(),
        is_active: true,
    }
}

fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Ayesha Khan".to_string(),
        phone: Some("+92-300-0000000".to_string()),
        email: Some("ayesha@example.com".to_string()),
    }
}

fn product_line(item_id: &str, quantity: i64) -> OrderLineRequest {
    OrderLineRequest {
        kind: ItemKind::Product,
        item_id: item_id.to_string(),
        color_id: None,
        size: None,
        quantity,
        addons: vec![],
    }
}

fn variant_line(item_id: &str, color_id: &str, size: &str, quantity: i64) -> OrderLineRequest {
    OrderLineRequest {
        kind: ItemKind::Product,
        item_id: item_id.to_string(),
        color_id: Some(color_id.to_string()),
        size: Some(size.to_string()),
        quantity,
        addons: vec![],
    }
}

fn pos_request(items: Vec<OrderLineRequest>) -> OrderRequest {
    OrderRequest {
        source: OrderSource::Pos,
        customer: customer(),
        items,
        delivery_zone_id: None,
        payment_method: PaymentMethod::Cash,
        coupon_code: None,
    }
}

// =============================================================================
// Happy Path
// =============================================================================

#[tokio::test]
async fn pos_order_commits_with_exact_breakdown() {
    let db = test_db().await;
    let color_id = seed_variant_product(&db, "din-tab", "Tables", 120000, "6-Seater", 10).await;
    db.catalog()
        .insert_item(&catalog_item("chair", ItemKind::Product, "Chairs", 50000, 8))
        .await
        .unwrap();
    db.taxes()
        .insert(&tax("tables-vat", 500, TaxType::Category, &["Tables"]))
        .await
        .unwrap();
    db.taxes()
        .insert(&tax("gst", 1000, TaxType::FullBill, &[]))
        .await
        .unwrap();
    db.coupons()
        .insert(&percentage_coupon("c1", "SAVE20", 2000, Some(30000)))
        .await
        .unwrap();
    db.zones().insert("zone-north", "North", 2500).await.unwrap();

    let engine = coordinator(&db);
    let mut request = pos_request(vec![
        variant_line("din-tab", &color_id, "6-Seater", 1),
        product_line("chair", 2),
    ]);
    request.coupon_code = Some("save20".to_string());
    request.delivery_zone_id = Some("zone-north".to_string());

    let receipt = engine.submit_order(request).await.unwrap();

    // subtotal 2200.00; category tax 5% of the Tables line only = 60.00;
    // discount 20% of 2200.00 capped at 300.00; delivery 25.00;
    // full-bill 10% of (2200 + 60 - 300 + 25) = 198.50
    assert_eq!(receipt.subtotal_cents, 220000);
    assert_eq!(receipt.category_tax_cents, 6000);
    assert_eq!(receipt.discount_cents, 30000);
    assert_eq!(receipt.delivery_charge_cents, 2500);
    assert_eq!(receipt.full_bill_tax_cents, 19850);
    assert_eq!(receipt.total_cents, 218350);
    assert_eq!(receipt.status, OrderStatus::Completed);

    // Round-trip: the persisted breakdown alone rebuilds the total
    assert_eq!(
        receipt.total_cents,
        receipt.subtotal_cents + receipt.category_tax_cents + receipt.full_bill_tax_cents
            - receipt.discount_cents
            + receipt.delivery_charge_cents
    );

    // Persisted order matches the receipt
    let order = db.orders().get_by_id(&receipt.order_id).await.unwrap().unwrap();
    assert_eq!(order.total_cents, receipt.total_cents);
    assert_eq!(order.applied_coupon_code.as_deref(), Some("SAVE20"));
    let items = db.orders().get_items(&receipt.order_id).await.unwrap();
    assert_eq!(items.len(), 2);

    // Stock moved: variant size 10 -> 9 (aggregate follows), chair 8 -> 6
    let table = db.catalog().get_item("din-tab").await.unwrap().unwrap();
    assert_eq!(table.stock, 9);
    let chair = db.catalog().get_item("chair").await.unwrap().unwrap();
    assert_eq!(chair.stock, 6);

    // Coupon consumed exactly once
    let coupon = db.coupons().get_by_id("c1").await.unwrap();
    assert_eq!(coupon.used_count, 1);

    // Notification dispatched through the outbox
    assert!(db.outbox().pending(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn addon_charges_and_consumes_material() {
    let db = test_db().await;
    db.catalog()
        .insert_item(&catalog_item("sofa", ItemKind::Product, "Sofas", 80000, 5))
        .await
        .unwrap();
    db.catalog()
        .insert_item(&catalog_item("fabric", ItemKind::Material, "Raw Materials", 1500, 50))
        .await
        .unwrap();
    db.catalog()
        .attach_addon(&Addon {
            id: "sofa-fabric".to_string(),
            product_id: "sofa".to_string(),
            material_id: "fabric".to_string(),
            material_name: "fabric item".to_string(),
            quantity_per_unit: 3,
            sale_price_cents: 2000,
        })
        .await
        .unwrap();

    let engine = coordinator(&db);
    let mut line = product_line("sofa", 2);
    line.addons = vec!["sofa-fabric".to_string()];
    let receipt = engine.submit_order(pos_request(vec![line])).await.unwrap();

    // subtotal = 2 × 800.00 + 2 × 20.00
    assert_eq!(receipt.subtotal_cents, 164000);
    assert_eq!(receipt.total_cents, 164000);

    // 2 sofas × 3 units of fabric each
    let fabric = db.catalog().get_item("fabric").await.unwrap().unwrap();
    assert_eq!(fabric.stock, 44);
    let sofa = db.catalog().get_item("sofa").await.unwrap().unwrap();
    assert_eq!(sofa.stock, 3);

    // The addon charge is captured on the order item
    let items = db.orders().get_items(&receipt.order_id).await.unwrap();
    let addons = db.orders().get_item_addons(&items[0].id).await.unwrap();
    assert_eq!(addons.len(), 1);
    assert_eq!(addons[0].line_total_cents, 4000);
}

#[tokio::test]
async fn goods_received_increments_stock() {
    let db = test_db().await;
    let color_id = seed_variant_product(&db, "shelf", "Storage", 30000, "Tall", 2).await;

    let engine = coordinator(&db);
    let mut request = pos_request(vec![variant_line("shelf", &color_id, "Tall", 5)]);
    request.source = OrderSource::PurchaseReceipt;
    request.payment_method = PaymentMethod::BankTransfer;

    let receipt = engine.submit_order(request).await.unwrap();

    // Receiving records cost only: no taxes, coupon, or delivery
    assert_eq!(receipt.subtotal_cents, 150000);
    assert_eq!(receipt.total_cents, 150000);
    assert_eq!(receipt.status, OrderStatus::Completed);

    let shelf = db.catalog().get_item("shelf").await.unwrap().unwrap();
    assert_eq!(shelf.stock, 7);
}

// =============================================================================
// Failure Atomicity
// =============================================================================

#[tokio::test]
async fn insufficient_stock_aborts_the_whole_order() {
    let db = test_db().await;
    let color_id = seed_variant_product(&db, "bed", "Beds", 200000, "King", 2).await;
    db.catalog()
        .insert_item(&catalog_item("chair", ItemKind::Product, "Chairs", 50000, 8))
        .await
        .unwrap();
    db.coupons()
        .insert(&percentage_coupon("c1", "SAVE10", 1000, None))
        .await
        .unwrap();

    let engine = coordinator(&db);
    let mut request = pos_request(vec![
        product_line("chair", 3),                       // plenty in stock
        variant_line("bed", &color_id, "King", 5),      // exceeds 2
    ]);
    request.coupon_code = Some("SAVE10".to_string());

    let err = engine.submit_order(request).await.unwrap_err();

    // The error names the exact variant that fell short
    match err {
        EngineError::InsufficientStock {
            item,
            available,
            requested,
        } => {
            assert_eq!(item, "bed item / Walnut / King");
            assert_eq!(available, 2);
            assert_eq!(requested, 5);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // Nothing moved: sibling line stock, coupon, orders, outbox
    let chair = db.catalog().get_item("chair").await.unwrap().unwrap();
    assert_eq!(chair.stock, 8);
    let bed = db.catalog().get_item("bed").await.unwrap().unwrap();
    assert_eq!(bed.stock, 2);
    let coupon = db.coupons().get_by_id("c1").await.unwrap();
    assert_eq!(coupon.used_count, 0);
    assert_eq!(db.orders().count().await.unwrap(), 0);
    assert!(db.outbox().pending(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_item_is_not_found() {
    let db = test_db().await;
    let engine = coordinator(&db);

    let err = engine
        .submit_order(pos_request(vec![product_line("ghost", 1)]))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::NotFound(_)));
    assert_eq!(err.kind(), "not_found");
    assert_eq!(db.orders().count().await.unwrap(), 0);
}

#[tokio::test]
async fn material_line_with_color_is_invalid() {
    let db = test_db().await;
    db.catalog()
        .insert_item(&catalog_item("oak", ItemKind::Material, "Raw Materials", 1200, 30))
        .await
        .unwrap();

    let engine = coordinator(&db);
    let request = pos_request(vec![OrderLineRequest {
        kind: ItemKind::Material,
        item_id: "oak".to_string(),
        color_id: Some("walnut".to_string()),
        size: Some("Large".to_string()),
        quantity: 1,
        addons: vec![],
    }]);

    let err = engine.submit_order(request).await.unwrap_err();

    match err {
        EngineError::InvalidItem { field, .. } => assert_eq!(field, "color_id"),
        other => panic!("expected InvalidItem, got {other:?}"),
    }

    // Material stock untouched
    let oak = db.catalog().get_item("oak").await.unwrap().unwrap();
    assert_eq!(oak.stock, 30);
}

#[tokio::test]
async fn unknown_delivery_zone_is_not_found() {
    let db = test_db().await;
    db.catalog()
        .insert_item(&catalog_item("chair", ItemKind::Product, "Chairs", 50000, 8))
        .await
        .unwrap();

    let engine = coordinator(&db);
    let mut request = pos_request(vec![product_line("chair", 1)]);
    request.delivery_zone_id = Some("zone-mars".to_string());

    let err = engine.submit_order(request).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let chair = db.catalog().get_item("chair").await.unwrap().unwrap();
    assert_eq!(chair.stock, 8);
}

#[tokio::test]
async fn empty_cart_is_rejected_before_any_transaction() {
    let db = test_db().await;
    let engine = coordinator(&db);

    let err = engine.submit_order(pos_request(vec![])).await.unwrap_err();
    assert_eq!(err.kind(), "validation_error");
}

// =============================================================================
// Coupons: the two intentional behaviors
// =============================================================================

#[tokio::test]
async fn checkout_silently_drops_below_minimum_coupon() {
    let db = test_db().await;
    db.catalog()
        .insert_item(&catalog_item("stool", ItemKind::Product, "Chairs", 3000, 10))
        .await
        .unwrap();
    db.coupons()
        .insert(&fixed_coupon("c1", "FLAT50", 5000, 10000))
        .await
        .unwrap();

    let engine = coordinator(&db);
    let mut request = pos_request(vec![product_line("stool", 1)]);
    request.coupon_code = Some("FLAT50".to_string());

    // Subtotal 30.00 is below the 100.00 minimum: the order still commits,
    // just without a discount, and the coupon is not consumed.
    let receipt = engine.submit_order(request).await.unwrap();
    assert_eq!(receipt.discount_cents, 0);
    assert_eq!(receipt.total_cents, 3000);

    let coupon = db.coupons().get_by_id("c1").await.unwrap();
    assert_eq!(coupon.used_count, 0);
    let order = db.orders().get_by_id(&receipt.order_id).await.unwrap().unwrap();
    assert_eq!(order.applied_coupon_code, None);
}

#[tokio::test]
async fn validate_coupon_rejects_below_minimum() {
    let db = test_db().await;
    db.coupons()
        .insert(&fixed_coupon("c1", "FLAT50", 5000, 10000))
        .await
        .unwrap();

    let engine = coordinator(&db);

    // The dedicated validate path rejects the same coupon explicitly
    let err = engine.validate_coupon("FLAT50", 3000).await.unwrap_err();
    match err {
        EngineError::CouponRejected(CouponRejection::BelowMinimum {
            subtotal_cents,
            minimum_cents,
        }) => {
            assert_eq!(subtotal_cents, 3000);
            assert_eq!(minimum_cents, 10000);
        }
        other => panic!("expected CouponRejected, got {other:?}"),
    }

    // And grants the discount above the minimum
    let discount = engine.validate_coupon("flat50", 20000).await.unwrap();
    assert_eq!(discount, 5000);
}

#[tokio::test]
async fn validate_coupon_unknown_code_is_not_found() {
    let db = test_db().await;
    let engine = coordinator(&db);

    let err = engine.validate_coupon("NOPE", 10000).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn used_count_advances_once_per_committed_order() {
    let db = test_db().await;
    db.catalog()
        .insert_item(&catalog_item("desk", ItemKind::Product, "Desks", 60000, 20))
        .await
        .unwrap();
    db.coupons()
        .insert(&percentage_coupon("c1", "SAVE10", 1000, None))
        .await
        .unwrap();

    let engine = coordinator(&db);
    for _ in 0..3 {
        let mut request = pos_request(vec![product_line("desk", 1)]);
        request.coupon_code = Some("SAVE10".to_string());
        engine.submit_order(request).await.unwrap();
    }

    let coupon = db.coupons().get_by_id("c1").await.unwrap();
    assert_eq!(coupon.used_count, 3);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn concurrent_orders_for_the_last_unit() {
    let db = test_db().await;
    let color_id = seed_variant_product(&db, "lamp", "Lighting", 9000, "Floor", 1).await;

    let engine = Arc::new(coordinator(&db));

    let submit = |engine: Arc<OrderCoordinator>, color_id: String| async move {
        engine
            .submit_order(pos_request(vec![variant_line("lamp", &color_id, "Floor", 1)]))
            .await
    };

    let (a, b) = tokio::join!(
        submit(engine.clone(), color_id.clone()),
        submit(engine.clone(), color_id.clone())
    );

    // Exactly one succeeds; the loser sees InsufficientStock
    let outcomes = [a, b];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let failure = outcomes.iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(
        failure.as_ref().unwrap_err(),
        EngineError::InsufficientStock { .. }
    ));

    // Final stock is exactly zero, never negative
    let locator = StockLocator::VariantSize {
        product_id: "lamp".to_string(),
        size_id: format!("lamp-walnut-{}", "Floor"),
    };
    assert_eq!(db.stock().stock_of(&locator).await.unwrap(), 0);
    let lamp = db.catalog().get_item("lamp").await.unwrap().unwrap();
    assert_eq!(lamp.stock, 0);
}

// =============================================================================
// Notifications
// =============================================================================

struct FailingDispatcher;

#[async_trait::async_trait]
impl NotificationDispatcher for FailingDispatcher {
    async fn notify(&self, _snapshot: &OrderSnapshot) -> Result<(), NotifyError> {
        Err(NotifyError("smtp connection refused".to_string()))
    }
}

#[tokio::test]
async fn notification_failure_never_fails_the_order() {
    let db = test_db().await;
    db.catalog()
        .insert_item(&catalog_item("chair", ItemKind::Product, "Chairs", 50000, 8))
        .await
        .unwrap();

    let engine = OrderCoordinator::new(db.clone()).with_dispatcher(Arc::new(FailingDispatcher));
    let receipt = engine
        .submit_order(pos_request(vec![product_line("chair", 1)]))
        .await
        .unwrap();

    // The order committed despite the dispatcher failing
    assert!(db.orders().get_by_id(&receipt.order_id).await.unwrap().is_some());
    let chair = db.catalog().get_item("chair").await.unwrap().unwrap();
    assert_eq!(chair.stock, 7);

    // The failure stays observable on the outbox row
    let pending = db.outbox().pending(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempts, 1);
    assert!(pending[0].last_error.as_deref().unwrap().contains("smtp"));
}
