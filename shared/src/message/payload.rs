//! 事件 payload 约定
//!
//! | 事件 | 必填字段 |
//! |------|----------|
//! | `order_created` | `order_id, order_number, order_type, items` |
//! | `order_status_changed` | `order_id, order_number, new_status` |
//! | `order_completed` | `order_id, order_number` (`receipt_text` 可选) |
//! | `order_cancelled` | `order_id` |
//!
//! `menu_item_updated` / `user_logged_in` / `user_logged_out` 的 payload 不做约束。

use serde::{Deserialize, Serialize};

use crate::models::{OrderStatus, OrderType};

/// 厨房单条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketItem {
    pub item_name: String,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

/// `order_created`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedPayload {
    pub order_id: i64,
    pub order_number: String,
    pub order_type: OrderType,
    #[serde(default)]
    pub items: Vec<TicketItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// 预排版的厨房单；缺省时由厨房打印机自行排版
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kitchen_ticket: Option<String>,
}

/// `order_status_changed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusChangedPayload {
    pub order_id: i64,
    pub order_number: String,
    pub new_status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_status: Option<OrderStatus>,
}

/// `order_completed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCompletedPayload {
    pub order_id: i64,
    pub order_number: String,
    /// 小票文本；为空时不打印
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_text: Option<String>,
}

/// `order_cancelled`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelledPayload {
    pub order_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
}
