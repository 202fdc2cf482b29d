//! 订单生命周期
//!
//! 创建订单（计价、校验、落库）、推进状态、查询待制作订单与销售汇总。
//! 本层不发布事件，事件由 [`OrderFlow`](super::OrderFlow) 负责。
//!
//! # 状态机
//!
//! ```text
//! pending ──▶ preparing ──▶ ready ──▶ completed
//!    │            │           │
//!    └────────────┴───────────┴──▶ cancelled
//! ```
//!
//! 默认 [`TransitionPolicy::Unchecked`] 接受任意目标状态；
//! [`TransitionPolicy::Strict`] 只接受上图中的迁移。

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use shared::error::ErrorCode;
use shared::models::{Order, OrderItem, OrderStatus, OrderType, PaymentMethod, SalesSummary};
use shared::util::now_millis;

use super::money;
use super::storage::{OrderStore, StorageError};
use crate::utils::time::{day_end_millis, day_start_millis, parse_date};
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_PRICE, validate_amount, validate_optional_text,
    validate_quantity, validate_required_text,
};
use crate::utils::{AppError, AppResult};

/// Upper bound for a tax rate (100%)
const MAX_TAX_RATE: f64 = 1.0;

/// Tax rate applied when a request carries none
pub const DEFAULT_TAX_RATE: f64 = 0.08;

/// 订单号冲突时的最大重试次数
const MAX_CREATE_ATTEMPTS: usize = 4;

/// 下单明细输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub menu_item_id: i64,
    pub item_name: String,
    pub quantity: i32,
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

impl NewOrderItem {
    pub fn new(
        menu_item_id: i64,
        item_name: impl Into<String>,
        quantity: i32,
        unit_price: f64,
    ) -> Self {
        Self {
            menu_item_id,
            item_name: item_name.into(),
            quantity,
            unit_price,
            special_instructions: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.special_instructions = Some(instructions.into());
        self
    }
}

/// 下单请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    pub order_type: OrderType,
    pub items: Vec<NewOrderItem>,
    pub payment_method: PaymentMethod,
    /// Employee taking the order
    pub created_by: i64,
    /// e.g. `0.08` for 8%; `None` uses the lifecycle's default rate
    #[serde(default)]
    pub tax_rate: Option<f64>,
}

impl CreateOrderRequest {
    pub fn new(
        order_type: OrderType,
        items: Vec<NewOrderItem>,
        payment_method: PaymentMethod,
        created_by: i64,
    ) -> Self {
        Self {
            customer_name: None,
            order_type,
            items,
            payment_method,
            created_by,
            tax_rate: None,
        }
    }

    pub fn with_tax_rate(mut self, tax_rate: f64) -> Self {
        self.tax_rate = Some(tax_rate);
        self
    }

    pub fn with_customer(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }
}

/// 下单结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub order_id: i64,
    pub order_number: String,
}

/// How status updates are checked against the state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Any target status is accepted
    #[default]
    Unchecked,
    /// Only transitions permitted by [`OrderStatus::can_transition_to`]
    Strict,
}

/// `ORD{millis}` order numbers, strictly increasing within the process
///
/// The same stamp doubles as the order id.
#[derive(Debug, Default)]
pub struct OrderNumberGenerator {
    last: AtomicI64,
}

impl OrderNumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next creation stamp (Unix millis); two calls in the same millisecond still differ
    pub fn next_stamp(&self) -> i64 {
        let now = now_millis();
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(now.max(prev + 1))
            })
            .unwrap_or(now);
        now.max(prev + 1)
    }

    pub fn next_number(&self) -> String {
        format!("ORD{}", self.next_stamp())
    }

    /// Never hand out a stamp at or below `stamp` again
    pub fn observe(&self, stamp: i64) {
        self.last.fetch_max(stamp, Ordering::SeqCst);
    }
}

/// 订单生命周期服务
pub struct OrderLifecycle {
    store: Arc<dyn OrderStore>,
    numbers: OrderNumberGenerator,
    policy: TransitionPolicy,
    timezone: Tz,
    default_tax_rate: f64,
}

impl OrderLifecycle {
    /// Build on `store`; the id generator resumes after the store's newest order
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        let numbers = OrderNumberGenerator::new();
        match store.last_order_id() {
            Ok(Some(last)) => numbers.observe(last),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read last order id"),
        }
        Self {
            store,
            numbers,
            policy: TransitionPolicy::default(),
            timezone: Tz::UTC,
            default_tax_rate: DEFAULT_TAX_RATE,
        }
    }

    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Business timezone used for date-range queries
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Rate used for requests without `tax_rate`
    pub fn with_default_tax_rate(mut self, tax_rate: f64) -> Self {
        self.default_tax_rate = tax_rate;
        self
    }

    pub fn default_tax_rate(&self) -> f64 {
        self.default_tax_rate
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// 创建订单
    ///
    /// Validates the request, computes totals and persists the order with
    /// status `pending` together with its items. Nothing is persisted when
    /// validation fails.
    pub fn create_order(&self, req: CreateOrderRequest) -> AppResult<CreatedOrder> {
        let tax_rate = req.tax_rate.unwrap_or(self.default_tax_rate);
        validate_request(&req, tax_rate)?;

        let totals = money::calculate_totals(
            req.items.iter().map(|i| (i.quantity, i.unit_price)),
            tax_rate,
        );

        let mut order = Order {
            id: 0,
            order_number: String::new(),
            customer_name: req.customer_name,
            order_type: req.order_type,
            status: OrderStatus::Pending,
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            total_amount: totals.total_amount,
            payment_method: req.payment_method,
            created_by: req.created_by,
            created_at: 0,
            completed_at: None,
        };
        let mut items: Vec<OrderItem> = req
            .items
            .into_iter()
            .map(|i| OrderItem {
                order_id: 0,
                menu_item_id: i.menu_item_id,
                total_price: money::to_f64(money::line_total(i.quantity, i.unit_price)),
                item_name: i.item_name,
                quantity: i.quantity,
                unit_price: i.unit_price,
                special_instructions: i.special_instructions,
            })
            .collect();

        let mut attempt = 1;
        loop {
            // id / 订单号 / 创建时间同源，同一毫秒内的订单仍有先后
            let stamp = self.numbers.next_stamp();
            order.id = stamp;
            order.order_number = format!("ORD{}", stamp);
            order.created_at = stamp;
            for item in &mut items {
                item.order_id = stamp;
            }

            match self.store.create_order(&order, &items) {
                Ok(_) => break,
                Err(StorageError::DuplicateOrderId(taken))
                    if attempt < MAX_CREATE_ATTEMPTS =>
                {
                    tracing::warn!(order_id = taken, attempt, "Order id taken, retrying");
                    self.numbers.observe(taken);
                }
                Err(StorageError::DuplicateOrderNumber(ref taken))
                    if attempt < MAX_CREATE_ATTEMPTS =>
                {
                    tracing::warn!(order_number = %taken, attempt, "Order number taken, retrying");
                    if let Some(stamp) = taken.strip_prefix("ORD").and_then(|n| n.parse().ok()) {
                        self.numbers.observe(stamp);
                    }
                }
                Err(e) => {
                    tracing::error!(order_number = %order.order_number, error = %e, "Failed to persist order");
                    return Err(AppError::from(e));
                }
            }
            attempt += 1;
        }

        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            items = items.len(),
            total = order.total_amount,
            "Order created"
        );
        Ok(CreatedOrder {
            order_id: order.id,
            order_number: order.order_number,
        })
    }

    /// 更新订单状态
    ///
    /// Stamps `completed_at` when the new status is `completed`. Returns the
    /// updated order; an unknown id yields [`ErrorCode::OrderNotFound`].
    pub fn update_order_status(&self, order_id: i64, new_status: OrderStatus) -> AppResult<Order> {
        if self.policy == TransitionPolicy::Strict {
            let current = self
                .store
                .get_order(order_id)?
                .ok_or_else(|| AppError::order_not_found(order_id))?;
            if !current.status.can_transition_to(new_status) {
                return Err(AppError::with_message(
                    ErrorCode::InvalidStatusTransition,
                    format!(
                        "Cannot change order {} from {} to {}",
                        current.order_number, current.status, new_status
                    ),
                )
                .with_detail("from", current.status.as_str())
                .with_detail("to", new_status.as_str()));
            }
        }

        let completed_at = (new_status == OrderStatus::Completed).then(now_millis);
        let order = self
            .store
            .update_order_status(order_id, new_status, completed_at)
            .map_err(|e| {
                tracing::warn!(order_id, status = %new_status, error = %e, "Status update failed");
                AppError::from(e)
            })?;

        tracing::info!(
            order_id,
            order_number = %order.order_number,
            status = %new_status,
            "Order status updated"
        );
        Ok(order)
    }

    pub fn get_order(&self, order_id: i64) -> AppResult<Option<Order>> {
        Ok(self.store.get_order(order_id)?)
    }

    pub fn get_order_items(&self, order_id: i64) -> AppResult<Vec<OrderItem>> {
        Ok(self.store.get_order_items(order_id)?)
    }

    /// Orders waiting on the kitchen (`pending` or `preparing`), oldest first
    pub fn get_pending_orders(&self) -> AppResult<Vec<Order>> {
        Ok(self.store.orders_with_status(&OrderStatus::KITCHEN_QUEUE)?)
    }

    /// Orders created on `date` (business timezone), newest first
    pub fn get_orders_by_date(&self, date: NaiveDate) -> AppResult<Vec<Order>> {
        let start = day_start_millis(date, self.timezone);
        let end = day_end_millis(date, self.timezone);
        let mut orders = self.store.orders_created_between(start, end)?;
        orders.reverse();
        Ok(orders)
    }

    /// 销售汇总 (起止日期均包含，业务时区)
    pub fn get_sales_summary(&self, start: NaiveDate, end: NaiveDate) -> AppResult<SalesSummary> {
        if start > end {
            return Err(AppError::validation(format!(
                "Start date {} is after end date {}",
                start, end
            )));
        }
        let start_ms = day_start_millis(start, self.timezone);
        let end_ms = day_end_millis(end, self.timezone);
        Ok(self.store.query_sales_summary(start_ms, end_ms)?)
    }

    /// [`get_sales_summary`](Self::get_sales_summary) with `YYYY-MM-DD` strings
    pub fn get_sales_summary_str(&self, start: &str, end: &str) -> AppResult<SalesSummary> {
        self.get_sales_summary(parse_date(start)?, parse_date(end)?)
    }
}

fn validate_request(req: &CreateOrderRequest, tax_rate: f64) -> AppResult<()> {
    if req.items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }
    validate_optional_text(&req.customer_name, "customer_name", MAX_NAME_LEN)?;
    if !tax_rate.is_finite() || !(0.0..=MAX_TAX_RATE).contains(&tax_rate) {
        return Err(
            AppError::validation(format!("tax_rate must be between 0 and 1, got {}", tax_rate))
                .with_detail("field", "tax_rate"),
        );
    }

    for (idx, item) in req.items.iter().enumerate() {
        validate_required_text(&item.item_name, "item_name", MAX_NAME_LEN)
            .and_then(|_| validate_quantity(item.quantity, "quantity"))
            .and_then(|_| validate_amount(item.unit_price, "unit_price", MAX_PRICE))
            .and_then(|_| {
                validate_optional_text(&item.special_instructions, "special_instructions", MAX_NOTE_LEN)
            })
            .map_err(|e| e.with_detail("item_index", idx))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::MemoryOrderStore;
    use std::collections::HashSet;

    fn lifecycle() -> (Arc<MemoryOrderStore>, OrderLifecycle) {
        let store = Arc::new(MemoryOrderStore::new());
        let lifecycle = OrderLifecycle::new(store.clone());
        (store, lifecycle)
    }

    fn burger_request() -> CreateOrderRequest {
        CreateOrderRequest::new(
            OrderType::DineIn,
            vec![NewOrderItem::new(1, "Burger", 2, 4.50).with_instructions("no onions")],
            PaymentMethod::Cash,
            1,
        )
        .with_tax_rate(0.10)
    }

    #[test]
    fn test_create_order_computes_totals() {
        let (store, lifecycle) = lifecycle();
        let created = lifecycle.create_order(burger_request()).unwrap();

        assert!(created.order_number.starts_with("ORD"));
        let order = store.get_order(created.order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal, 9.00);
        assert_eq!(order.tax_amount, 0.90);
        assert_eq!(order.total_amount, 9.90);
        assert_eq!(order.completed_at, None);

        let items = store.get_order_items(created.order_id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].total_price, 9.00);
        assert_eq!(items[0].special_instructions.as_deref(), Some("no onions"));
    }

    #[test]
    fn test_empty_items_never_persisted() {
        let (store, lifecycle) = lifecycle();
        let mut req = burger_request();
        req.items.clear();

        let err = lifecycle.create_order(req).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderEmpty);
        assert!(store.is_empty());
    }

    #[test]
    fn test_invalid_lines_rejected() {
        let (store, lifecycle) = lifecycle();

        let mut req = burger_request();
        req.items[0].quantity = 0;
        assert!(lifecycle.create_order(req).unwrap_err().is_validation());

        let mut req = burger_request();
        req.items.push(NewOrderItem::new(2, "Fries", 1, -1.0));
        let err = lifecycle.create_order(req).unwrap_err();
        assert_eq!(err.details.unwrap()["item_index"], 1);

        let mut req = burger_request();
        req.tax_rate = Some(f64::NAN);
        assert!(lifecycle.create_order(req).is_err());

        assert!(store.is_empty());
    }

    #[test]
    fn test_order_numbers_are_unique() {
        let generator = OrderNumberGenerator::new();
        let numbers: HashSet<String> = (0..1000).map(|_| generator.next_number()).collect();
        assert_eq!(numbers.len(), 1000);
    }

    #[test]
    fn test_burst_of_orders_never_collides() {
        let (store, lifecycle) = lifecycle();
        let ids: HashSet<i64> = (0..5000)
            .map(|_| lifecycle.create_order(burger_request()).unwrap().order_id)
            .collect();
        assert_eq!(ids.len(), 5000);
        assert_eq!(store.len(), 5000);
    }

    #[test]
    fn test_ids_resume_after_existing_orders() {
        let (store, first) = lifecycle();
        let created = first.create_order(burger_request()).unwrap();

        // 存量订单的 id 领先于当前时钟
        let ahead = now_millis() + 60_000;
        let mut order = store.get_order(created.order_id).unwrap().unwrap();
        order.id = ahead;
        order.order_number = format!("ORD{}", ahead);
        store.create_order(&order, &[]).unwrap();

        let second = OrderLifecycle::new(store.clone());
        let next = second.create_order(burger_request()).unwrap();
        assert!(next.order_id > ahead);
        assert_eq!(store.last_order_id().unwrap(), Some(next.order_id));
    }

    #[test]
    fn test_default_tax_rate_applies_without_request_rate() {
        let store = Arc::new(MemoryOrderStore::new());
        let lifecycle = OrderLifecycle::new(store.clone()).with_default_tax_rate(0.20);
        let mut req = burger_request();
        req.tax_rate = None;

        let created = lifecycle.create_order(req).unwrap();
        let order = store.get_order(created.order_id).unwrap().unwrap();
        assert_eq!(order.tax_amount, 1.80);
        assert_eq!(order.total_amount, 10.80);

        let mut req = burger_request();
        req.tax_rate = None;
        let lifecycle = OrderLifecycle::new(store.clone()).with_default_tax_rate(1.5);
        assert!(lifecycle.create_order(req).unwrap_err().is_validation());
    }

    #[test]
    fn test_status_update_stamps_completion() {
        let (_, lifecycle) = lifecycle();
        let created = lifecycle.create_order(burger_request()).unwrap();

        let order = lifecycle
            .update_order_status(created.order_id, OrderStatus::Preparing)
            .unwrap();
        assert_eq!(order.status, OrderStatus::Preparing);
        assert!(order.completed_at.is_none());

        let order = lifecycle
            .update_order_status(created.order_id, OrderStatus::Completed)
            .unwrap();
        assert!(order.completed_at.is_some());
    }

    #[test]
    fn test_unknown_order_is_not_found() {
        let (_, lifecycle) = lifecycle();
        let err = lifecycle
            .update_order_status(404, OrderStatus::Ready)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }

    #[test]
    fn test_unchecked_policy_accepts_any_transition() {
        let (_, lifecycle) = lifecycle();
        let created = lifecycle.create_order(burger_request()).unwrap();
        lifecycle
            .update_order_status(created.order_id, OrderStatus::Cancelled)
            .unwrap();
        let order = lifecycle
            .update_order_status(created.order_id, OrderStatus::Preparing)
            .unwrap();
        assert_eq!(order.status, OrderStatus::Preparing);
    }

    #[test]
    fn test_strict_policy_rejects_illegal_transition() {
        let store = Arc::new(MemoryOrderStore::new());
        let lifecycle = OrderLifecycle::new(store).with_policy(TransitionPolicy::Strict);
        let created = lifecycle.create_order(burger_request()).unwrap();

        let err = lifecycle
            .update_order_status(created.order_id, OrderStatus::Completed)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);

        lifecycle
            .update_order_status(created.order_id, OrderStatus::Preparing)
            .unwrap();
        lifecycle
            .update_order_status(created.order_id, OrderStatus::Cancelled)
            .unwrap();
        assert!(lifecycle
            .update_order_status(created.order_id, OrderStatus::Pending)
            .is_err());
    }

    #[test]
    fn test_pending_orders_exclude_ready_and_cancelled() {
        let (_, lifecycle) = lifecycle();
        let a = lifecycle.create_order(burger_request()).unwrap();
        let b = lifecycle.create_order(burger_request()).unwrap();
        let c = lifecycle.create_order(burger_request()).unwrap();
        lifecycle.update_order_status(a.order_id, OrderStatus::Preparing).unwrap();
        lifecycle.update_order_status(b.order_id, OrderStatus::Ready).unwrap();
        lifecycle.update_order_status(c.order_id, OrderStatus::Cancelled).unwrap();

        let pending = lifecycle.get_pending_orders().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, a.order_id);
    }

    #[test]
    fn test_sales_summary_today() {
        let (_, lifecycle) = lifecycle();
        let a = lifecycle.create_order(burger_request()).unwrap();
        lifecycle.create_order(burger_request()).unwrap();
        lifecycle.update_order_status(a.order_id, OrderStatus::Cancelled).unwrap();

        let today = crate::utils::time::today(lifecycle.timezone());
        let summary = lifecycle.get_sales_summary(today, today).unwrap();
        assert_eq!(summary.total_orders, 1);
        assert_eq!(summary.total_sales, 9.90);
        assert_eq!(summary.total_tax, 0.90);
        assert_eq!(summary.average_order, 9.90);

        let by_date = lifecycle.get_orders_by_date(today).unwrap();
        assert_eq!(by_date.len(), 2);
    }

    #[test]
    fn test_sales_summary_empty_and_invalid_range() {
        let (_, lifecycle) = lifecycle();
        assert_eq!(
            lifecycle.get_sales_summary_str("2020-01-01", "2020-01-31").unwrap(),
            SalesSummary::default()
        );
        assert!(lifecycle
            .get_sales_summary_str("2020-02-01", "2020-01-01")
            .unwrap_err()
            .is_validation());
        assert!(lifecycle.get_sales_summary_str("yesterday", "2020-01-01").is_err());
    }
}
