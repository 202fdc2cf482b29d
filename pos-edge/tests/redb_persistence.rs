//! redb 存储持久化测试

use std::sync::Arc;

use chrono::NaiveDate;
use pos_edge::{
    CreateOrderRequest, NewOrderItem, OrderLifecycle, OrderStore, RedbOrderStore,
};
use shared::models::{OrderStatus, OrderType, PaymentMethod};

fn request(price: f64) -> CreateOrderRequest {
    CreateOrderRequest::new(
        OrderType::Takeout,
        vec![NewOrderItem::new(3, "Noodles", 1, price)],
        PaymentMethod::Card,
        2,
    )
    .with_tax_rate(0.0)
}

#[test]
fn orders_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pos.redb");

    let (kept, cancelled) = {
        let store = Arc::new(RedbOrderStore::open(&path).unwrap());
        let lifecycle = OrderLifecycle::new(store);
        let kept = lifecycle.create_order(request(12.5)).unwrap();
        let cancelled = lifecycle.create_order(request(3.0)).unwrap();
        lifecycle
            .update_order_status(kept.order_id, OrderStatus::Completed)
            .unwrap();
        lifecycle
            .update_order_status(cancelled.order_id, OrderStatus::Cancelled)
            .unwrap();
        (kept, cancelled)
    };

    let store = RedbOrderStore::open(&path).unwrap();
    assert_eq!(store.count().unwrap(), 2);

    let order = store.get_order(kept.order_id).unwrap().unwrap();
    assert_eq!(order.order_number, kept.order_number);
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(order.completed_at.is_some());
    assert_eq!(store.get_order_items(kept.order_id).unwrap()[0].item_name, "Noodles");
    assert_eq!(store.last_order_id().unwrap(), Some(cancelled.order_id));

    let lifecycle = OrderLifecycle::new(Arc::new(store));
    let today = chrono::Utc::now().date_naive();
    let summary = lifecycle
        .get_sales_summary(today - chrono::Duration::days(1), today + chrono::Duration::days(1))
        .unwrap();
    assert_eq!(summary.total_orders, 1);
    assert_eq!(summary.total_sales, 12.5);

    let by_date = lifecycle.get_orders_by_date(today).unwrap();
    assert_eq!(by_date.len(), 2);
    assert_eq!(by_date[0].id, cancelled.order_id);

    // 重开后继续递增，不与已有订单冲突
    let next = lifecycle.create_order(request(1.0)).unwrap();
    assert!(next.order_id > cancelled.order_id);
}

#[test]
fn empty_range_yields_zeroed_summary() {
    let store = Arc::new(RedbOrderStore::open_in_memory().unwrap());
    let lifecycle = OrderLifecycle::new(store);
    lifecycle.create_order(request(5.0)).unwrap();

    let day = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
    let summary = lifecycle.get_sales_summary(day, day).unwrap();
    assert_eq!(summary, Default::default());

    assert!(lifecycle.get_sales_summary(day.succ_opt().unwrap(), day).is_err());
}
