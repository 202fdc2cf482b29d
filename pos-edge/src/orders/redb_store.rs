//! redb-based order store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | JSON `{order, items}` | 订单 + 明细，一条记录 |
//! | `order_numbers` | `order_number` | `order_id` | 订单号唯一索引 |
//!
//! # Durability
//!
//! redb uses `Durability::Immediate` by default: a commit is persistent as
//! soon as `commit()` returns. Each `create_order` is a single write
//! transaction, so an order never exists without its items.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use shared::models::{Order, OrderItem, OrderStatus};

use super::storage::{OrderStore, StorageError, StorageResult, StoredOrder, sort_oldest_first};

/// Orders table: key = order_id, value = JSON-serialized StoredOrder
const ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("orders");

/// Unique index: order_number -> order_id
const ORDER_NUMBERS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("order_numbers");

/// Order store backed by redb
#[derive(Clone)]
pub struct RedbOrderStore {
    db: Arc<Database>,
}

impl RedbOrderStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_NUMBERS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Number of stored orders
    pub fn count(&self) -> StorageResult<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        Ok(table.len()? as usize)
    }

    fn load(&self, order_id: i64) -> StorageResult<Option<StoredOrder>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        let stored = match table.get(order_id)? {
            Some(guard) => Some(serde_json::from_slice(guard.value())?),
            None => None,
        };
        Ok(stored)
    }

    /// Full scan, keeping orders accepted by `filter`
    fn scan(&self, filter: impl Fn(&Order) -> bool) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let stored: StoredOrder = serde_json::from_slice(value.value())?;
            if filter(&stored.order) {
                orders.push(stored.order);
            }
        }
        sort_oldest_first(&mut orders);
        Ok(orders)
    }
}

impl OrderStore for RedbOrderStore {
    fn create_order(&self, order: &Order, items: &[OrderItem]) -> StorageResult<i64> {
        let stored = StoredOrder {
            order: order.clone(),
            items: items.to_vec(),
        };
        let value = serde_json::to_vec(&stored)?;

        let txn = self.db.begin_write()?;
        {
            let mut numbers = txn.open_table(ORDER_NUMBERS_TABLE)?;
            if numbers.get(order.order_number.as_str())?.is_some() {
                // txn 未提交即丢弃 → 回滚
                return Err(StorageError::DuplicateOrderNumber(
                    order.order_number.clone(),
                ));
            }

            let mut orders = txn.open_table(ORDERS_TABLE)?;
            if orders.get(order.id)?.is_some() {
                return Err(StorageError::DuplicateOrderId(order.id));
            }

            numbers.insert(order.order_number.as_str(), order.id)?;
            orders.insert(order.id, value.as_slice())?;
        }
        txn.commit()?;

        tracing::debug!(order_id = order.id, order_number = %order.order_number, "Order persisted");
        Ok(order.id)
    }

    fn last_order_id(&self) -> StorageResult<Option<i64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        Ok(table.last()?.map(|(key, _)| key.value()))
    }

    fn update_order_status(
        &self,
        order_id: i64,
        status: OrderStatus,
        completed_at: Option<i64>,
    ) -> StorageResult<Order> {
        let txn = self.db.begin_write()?;
        let updated = {
            let mut table = txn.open_table(ORDERS_TABLE)?;
            let existing = match table.get(order_id)? {
                Some(guard) => serde_json::from_slice::<StoredOrder>(guard.value())?,
                None => return Err(StorageError::OrderNotFound(order_id)),
            };

            let mut stored = existing;
            stored.order.status = status;
            if completed_at.is_some() {
                stored.order.completed_at = completed_at;
            }

            let value = serde_json::to_vec(&stored)?;
            table.insert(order_id, value.as_slice())?;
            stored.order
        };
        txn.commit()?;

        Ok(updated)
    }

    fn get_order(&self, order_id: i64) -> StorageResult<Option<Order>> {
        Ok(self.load(order_id)?.map(|stored| stored.order))
    }

    fn get_order_items(&self, order_id: i64) -> StorageResult<Vec<OrderItem>> {
        Ok(self
            .load(order_id)?
            .map(|stored| stored.items)
            .unwrap_or_default())
    }

    fn orders_with_status(&self, statuses: &[OrderStatus]) -> StorageResult<Vec<Order>> {
        self.scan(|o| statuses.contains(&o.status))
    }

    fn orders_created_between(&self, start: i64, end: i64) -> StorageResult<Vec<Order>> {
        self.scan(|o| o.created_at >= start && o.created_at < end)
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
            customer_name: Some("Ana".to_string()),
            order_type: OrderType::Delivery,
            status: OrderStatus::Pending,
            subtotal: 10.0,
            tax_amount: 0.8,
            total_amount: 10.8,
            payment_method: PaymentMethod::Mobile,
            created_by: 3,
            created_at,
            completed_at: None,
        }
    }

    fn item(order_id: i64) -> OrderItem {
        OrderItem {
            order_id,
            menu_item_id: 7,
            item_name: "Pad Thai".to_string(),
            quantity: 1,
            unit_price: 10.0,
            total_price: 10.0,
            special_instructions: Some("extra spicy".to_string()),
        }
    }

    #[test]
    fn test_create_and_load() {
        let store = RedbOrderStore::open_in_memory().unwrap();
        store.create_order(&order(1, "ORD1", 100), &[item(1)]).unwrap();

        let loaded = store.get_order(1).unwrap().unwrap();
        assert_eq!(loaded, order(1, "ORD1", 100));
        assert_eq!(store.get_order_items(1).unwrap(), vec![item(1)]);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_number_rolls_back() {
        let store = RedbOrderStore::open_in_memory().unwrap();
        store.create_order(&order(1, "ORD1", 100), &[]).unwrap();

        let err = store.create_order(&order(2, "ORD1", 200), &[item(2)]).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateOrderNumber(_)));
        assert!(store.get_order(2).unwrap().is_none());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_update_status() {
        let store = RedbOrderStore::open_in_memory().unwrap();
        store.create_order(&order(1, "ORD1", 100), &[item(1)]).unwrap();

        let updated = store
            .update_order_status(1, OrderStatus::Completed, Some(999))
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Completed);
        assert_eq!(updated.completed_at, Some(999));

        // 明细不受状态更新影响
        assert_eq!(store.get_order_items(1).unwrap().len(), 1);
        assert!(matches!(
            store.update_order_status(2, OrderStatus::Ready, None),
            Err(StorageError::OrderNotFound(2))
        ));
    }

    #[test]
    fn test_queries() {
        let store = RedbOrderStore::open_in_memory().unwrap();
        store.create_order(&order(2, "ORD2", 200), &[]).unwrap();
        store.create_order(&order(1, "ORD1", 100), &[]).unwrap();
        store.create_order(&order(3, "ORD3", 300), &[]).unwrap();
        store
            .update_order_status(1, OrderStatus::Cancelled, None)
            .unwrap();

        let pending = store
            .orders_with_status(&OrderStatus::KITCHEN_QUEUE)
            .unwrap();
        assert_eq!(pending.iter().map(|o| o.id).collect::<Vec<_>>(), vec![2, 3]);

        let summary = store.query_sales_summary(0, 250).unwrap();
        assert_eq!(summary.total_orders, 1);
        assert_eq!(summary.total_sales, 10.8);
    }
}
