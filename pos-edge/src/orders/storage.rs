//! Order persistence collaborator
//!
//! [`OrderStore`] 是订单生命周期与持久化之间的唯一接口。
//! 时间参数统一为 Unix millis；日期→时间戳换算在生命周期层完成。
//!
//! # 实现
//!
//! | 类型 | 后端 | 用途 |
//! |------|------|------|
//! | [`MemoryOrderStore`] | `parking_lot::RwLock<HashMap>` | 测试 / 无盘运行 |
//! | [`RedbOrderStore`](super::RedbOrderStore) | redb 嵌入式数据库 | 生产 |

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderItem, OrderStatus, SalesSummary};
use thiserror::Error;

use super::money;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Duplicate order number: {0}")]
    DuplicateOrderNumber(String),

    #[error("Duplicate order id: {0}")]
    DuplicateOrderId(i64),

    /// Failure reported by a custom backend
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::OrderNotFound(id) => AppError::order_not_found(id),
            StorageError::DuplicateOrderNumber(number) => {
                AppError::with_message(
                    ErrorCode::OrderNumberExists,
                    format!("Order number {} already exists", number),
                )
                .with_detail("order_number", number)
            }
            StorageError::DuplicateOrderId(id) => {
                AppError::conflict(format!("Order {} already exists", id))
                    .with_detail("order_id", id)
            }
            StorageError::Serialization(e) => AppError::with_message(
                ErrorCode::StorageCorrupted,
                format!("Corrupted order record: {}", e),
            ),
            other => AppError::database(other.to_string()),
        }
    }
}

/// 持久化记录: 订单与其明细一起存取
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub(crate) struct StoredOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Persistence collaborator for orders and their items
///
/// Implementations must be safe to call from several threads at once.
/// Listing methods return orders oldest first (`created_at`, then `id`).
pub trait OrderStore: Send + Sync {
    /// Persist an order together with its items, all or nothing
    ///
    /// Fails with [`StorageError::DuplicateOrderNumber`] if the order number
    /// is already taken.
    fn create_order(&self, order: &Order, items: &[OrderItem]) -> StorageResult<i64>;

    /// Set the status of an order; `completed_at` is stamped when given and
    /// left untouched otherwise. Returns the updated order.
    fn update_order_status(
        &self,
        order_id: i64,
        status: OrderStatus,
        completed_at: Option<i64>,
    ) -> StorageResult<Order>;

    fn get_order(&self, order_id: i64) -> StorageResult<Option<Order>>;

    /// Largest order id in the store
    fn last_order_id(&self) -> StorageResult<Option<i64>>;

    /// Items of an order, in insertion order (empty if the order is unknown)
    fn get_order_items(&self, order_id: i64) -> StorageResult<Vec<OrderItem>>;

    fn orders_with_status(&self, statuses: &[OrderStatus]) -> StorageResult<Vec<Order>>;

    /// Orders with `start <= created_at < end`
    fn orders_created_between(&self, start: i64, end: i64) -> StorageResult<Vec<Order>>;

    /// Sales over `start <= created_at < end`, cancelled orders excluded
    fn query_sales_summary(&self, start: i64, end: i64) -> StorageResult<SalesSummary> {
        let orders = self.orders_created_between(start, end)?;
        Ok(money::summarize_sales(&orders))
    }
}

pub(crate) fn sort_oldest_first(orders: &mut [Order]) {
    orders.sort_by_key(|o| (o.created_at, o.id));
}

#[derive(Default)]
struct MemoryInner {
    orders: HashMap<i64, StoredOrder>,
    numbers: HashMap<String, i64>,
}

/// In-memory order store
#[derive(Default)]
pub struct MemoryOrderStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().orders.is_empty()
    }

    fn collect(&self, filter: impl Fn(&Order) -> bool) -> Vec<Order> {
        let inner = self.inner.read();
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .map(|stored| &stored.order)
            .filter(|o| filter(*o))
            .cloned()
            .collect();
        drop(inner);
        sort_oldest_first(&mut orders);
        orders
    }
}

impl OrderStore for MemoryOrderStore {
    fn create_order(&self, order: &Order, items: &[OrderItem]) -> StorageResult<i64> {
        let mut inner = self.inner.write();
        if inner.numbers.contains_key(&order.order_number) {
            return Err(StorageError::DuplicateOrderNumber(
                order.order_number.clone(),
            ));
        }
        if inner.orders.contains_key(&order.id) {
            return Err(StorageError::DuplicateOrderId(order.id));
        }

        inner.numbers.insert(order.order_number.clone(), order.id);
        inner.orders.insert(
            order.id,
            StoredOrder {
                order: order.clone(),
                items: items.to_vec(),
            },
        );
        Ok(order.id)
    }

    fn update_order_status(
        &self,
        order_id: i64,
        status: OrderStatus,
        completed_at: Option<i64>,
    ) -> StorageResult<Order> {
        let mut inner = self.inner.write();
        let stored = inner
            .orders
            .get_mut(&order_id)
            .ok_or(StorageError::OrderNotFound(order_id))?;

        stored.order.status = status;
        if completed_at.is_some() {
            stored.order.completed_at = completed_at;
        }
        Ok(stored.order.clone())
    }

    fn get_order(&self, order_id: i64) -> StorageResult<Option<Order>> {
        Ok(self
            .inner
            .read()
            .orders
            .get(&order_id)
            .map(|stored| stored.order.clone()))
    }

    fn last_order_id(&self) -> StorageResult<Option<i64>> {
        Ok(self.inner.read().orders.keys().max().copied())
    }

    fn get_order_items(&self, order_id: i64) -> StorageResult<Vec<OrderItem>> {
        Ok(self
            .inner
            .read()
            .orders
            .get(&order_id)
            .map(|stored| stored.items.clone())
            .unwrap_or_default())
    }

    fn orders_with_status(&self, statuses: &[OrderStatus]) -> StorageResult<Vec<Order>> {
        Ok(self.collect(|o| statuses.contains(&o.status)))
    }

    fn orders_created_between(&self, start: i64, end: i64) -> StorageResult<Vec<Order>> {
        Ok(self.collect(|o| o.created_at >= start && o.created_at < end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{OrderType, PaymentMethod};

    fn order(id: i64, number: &str, created_at: i64) -> Order {
        Order {
            id,
            order_number: number.to_string(),
            customer_name: None,
            order_type: OrderType::DineIn,
            status: OrderStatus::Pending,
            subtotal: 9.0,
            tax_amount: 0.9,
            total_amount: 9.9,
            payment_method: PaymentMethod::Card,
            created_by: 1,
            created_at,
            completed_at: None,
        }
    }

    fn item(order_id: i64, name: &str) -> OrderItem {
        OrderItem {
            order_id,
            menu_item_id: 10,
            item_name: name.to_string(),
            quantity: 2,
            unit_price: 4.5,
            total_price: 9.0,
            special_instructions: None,
        }
    }

    #[test]
    fn test_create_and_read_back() {
        let store = MemoryOrderStore::new();
        store
            .create_order(&order(1, "ORD1", 100), &[item(1, "Burger"), item(1, "Fries")])
            .unwrap();

        assert_eq!(store.get_order(1).unwrap().unwrap().order_number, "ORD1");
        let items = store.get_order_items(1).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].item_name, "Fries");
        assert!(store.get_order(2).unwrap().is_none());
        assert!(store.get_order_items(2).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_order_number_rejected() {
        let store = MemoryOrderStore::new();
        store.create_order(&order(1, "ORD1", 100), &[]).unwrap();
        let err = store.create_order(&order(2, "ORD1", 101), &[]).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateOrderNumber(n) if n == "ORD1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_status_stamps_completion_only_when_given() {
        let store = MemoryOrderStore::new();
        store.create_order(&order(1, "ORD1", 100), &[]).unwrap();

        let updated = store
            .update_order_status(1, OrderStatus::Preparing, None)
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Preparing);
        assert_eq!(updated.completed_at, None);

        let updated = store
            .update_order_status(1, OrderStatus::Completed, Some(500))
            .unwrap();
        assert_eq!(updated.completed_at, Some(500));

        let err = store
            .update_order_status(9, OrderStatus::Ready, None)
            .unwrap_err();
        assert!(matches!(err, StorageError::OrderNotFound(9)));
    }

    #[test]
    fn test_listing_is_oldest_first_and_half_open() {
        let store = MemoryOrderStore::new();
        store.create_order(&order(3, "ORD3", 300), &[]).unwrap();
        store.create_order(&order(1, "ORD1", 100), &[]).unwrap();
        store.create_order(&order(2, "ORD2", 200), &[]).unwrap();
        store
            .update_order_status(2, OrderStatus::Ready, None)
            .unwrap();

        let queue = store
            .orders_with_status(&OrderStatus::KITCHEN_QUEUE)
            .unwrap();
        let ids: Vec<i64> = queue.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 3]);

        let window = store.orders_created_between(100, 300).unwrap();
        let ids: Vec<i64> = window.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_default_sales_summary() {
        let store = MemoryOrderStore::new();
        store.create_order(&order(1, "ORD1", 100), &[]).unwrap();
        store.create_order(&order(2, "ORD2", 200), &[]).unwrap();
        store
            .update_order_status(2, OrderStatus::Cancelled, None)
            .unwrap();

        let summary = store.query_sales_summary(0, 1_000).unwrap();
        assert_eq!(summary.total_orders, 1);
        assert_eq!(summary.total_sales, 9.9);

        assert_eq!(
            store.query_sales_summary(1_000, 2_000).unwrap(),
            SalesSummary::default()
        );
    }

    #[test]
    fn test_storage_error_maps_to_app_error() {
        let err: AppError = StorageError::OrderNotFound(5).into();
        assert_eq!(err.code, ErrorCode::OrderNotFound);

        let err: AppError = StorageError::DuplicateOrderNumber("ORD1".into()).into();
        assert_eq!(err.code, ErrorCode::OrderNumberExists);

        let err: AppError = StorageError::Backend("disk full".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
