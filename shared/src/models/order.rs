//! Order Model
//!
//! 订单生命周期:
//!
//! ```text
//! pending ──▶ preparing ──▶ ready ──▶ completed
//!    │            │           │
//!    └────────────┴───────────┴──────▶ cancelled
//! ```
//!
//! `completed` 和 `cancelled` 为终态。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 订单类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// 堂食
    #[default]
    DineIn,
    /// 外带
    Takeout,
    /// 外卖配送
    Delivery,
}

impl OrderType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DineIn => "dine_in",
            Self::Takeout => "takeout",
            Self::Delivery => "delivery",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 订单状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// 已下单，等待厨房
    #[default]
    Pending,
    /// 制作中
    Preparing,
    /// 待取餐
    Ready,
    /// 已完成 (终态)
    Completed,
    /// 已取消 (终态)
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        Self::Pending,
        Self::Preparing,
        Self::Ready,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Statuses shown on the kitchen queue
    pub const KITCHEN_QUEUE: [OrderStatus; 2] = [Self::Pending, Self::Preparing];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// 是否终态
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// Re-applying the current status is not a transition and is rejected.
    pub const fn can_transition_to(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Preparing)
            | (Self::Preparing, Self::Ready)
            | (Self::Ready, Self::Completed) => true,
            (Self::Pending | Self::Preparing | Self::Ready, Self::Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// 支付方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Mobile,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order entity
///
/// Money amounts are in currency units, rounded to 2 decimal places and
/// frozen at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    /// 订单号 (唯一，面向顾客)
    pub order_number: String,
    pub customer_name: Option<String>,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
    pub payment_method: PaymentMethod,
    /// Employee who took the order
    pub created_by: i64,
    /// Unix millis
    pub created_at: i64,
    /// Unix millis, set when the order reaches `completed`
    pub completed_at: Option<i64>,
}

/// Order item (owned by its order, created together with it)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub order_id: i64,
    pub menu_item_id: i64,
    /// Menu item name snapshot
    pub item_name: String,
    pub quantity: i32,
    pub unit_price: f64,
    /// quantity * unit_price
    pub total_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

/// Aggregated sales over a date range (cancelled orders excluded)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SalesSummary {
    pub total_orders: u64,
    pub total_sales: f64,
    pub total_tax: f64,
    pub average_order: f64,
}
