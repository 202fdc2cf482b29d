//! Order flow
//!
//! 把订单生命周期和事件总线串起来：先落库，成功后再发布事件。
//!
//! | 操作 | 发布 |
//! |------|------|
//! | `place_order` | `order_created` |
//! | `change_status(.., completed)` | `order_status_changed` → `order_completed` (带小票文本) |
//! | `change_status(.., cancelled)` | `order_status_changed` → `order_cancelled` |
//! | `change_status(.., 其他)` | `order_status_changed` |
//!
//! 校验或存储失败时不发布任何事件。

use std::sync::Arc;

use serde::Serialize;
use shared::message::{
    EventType, OrderCancelledPayload, OrderCompletedPayload, OrderCreatedPayload,
    OrderStatusChangedPayload, TicketItem,
};
use shared::models::{Order, OrderStatus};

use super::lifecycle::{CreateOrderRequest, CreatedOrder, OrderLifecycle};
use crate::message::EventBus;
use crate::printing::ReceiptRenderer;
use crate::utils::{AppError, AppResult};

pub struct OrderFlow {
    lifecycle: Arc<OrderLifecycle>,
    bus: Arc<EventBus>,
    receipts: ReceiptRenderer,
}

impl OrderFlow {
    pub fn new(lifecycle: Arc<OrderLifecycle>, bus: Arc<EventBus>, receipts: ReceiptRenderer) -> Self {
        Self {
            lifecycle,
            bus,
            receipts,
        }
    }

    pub fn lifecycle(&self) -> &Arc<OrderLifecycle> {
        &self.lifecycle
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Create the order and announce it to the kitchen
    pub fn place_order(&self, req: CreateOrderRequest) -> AppResult<CreatedOrder> {
        let ticket_items: Vec<TicketItem> = req
            .items
            .iter()
            .map(|i| TicketItem {
                item_name: i.item_name.clone(),
                quantity: i.quantity,
                special_instructions: i.special_instructions.clone(),
            })
            .collect();
        let order_type = req.order_type;
        let customer_name = req.customer_name.clone();

        let created = self.lifecycle.create_order(req)?;

        self.emit(
            EventType::OrderCreated,
            &OrderCreatedPayload {
                order_id: created.order_id,
                order_number: created.order_number.clone(),
                order_type,
                items: ticket_items,
                customer_name,
                kitchen_ticket: None,
            },
        );
        Ok(created)
    }

    /// Apply a status change and publish the matching events
    pub fn change_status(&self, order_id: i64, new_status: OrderStatus) -> AppResult<Order> {
        let old_status = self
            .lifecycle
            .get_order(order_id)?
            .ok_or_else(|| AppError::order_not_found(order_id))?
            .status;

        let order = self.lifecycle.update_order_status(order_id, new_status)?;

        self.emit(
            EventType::OrderStatusChanged,
            &OrderStatusChangedPayload {
                order_id,
                order_number: order.order_number.clone(),
                new_status,
                old_status: Some(old_status),
            },
        );

        match new_status {
            OrderStatus::Completed => {
                let receipt_text = self.render_receipt(&order);
                self.emit(
                    EventType::OrderCompleted,
                    &OrderCompletedPayload {
                        order_id,
                        order_number: order.order_number.clone(),
                        receipt_text,
                    },
                );
            }
            OrderStatus::Cancelled => {
                self.emit(
                    EventType::OrderCancelled,
                    &OrderCancelledPayload {
                        order_id,
                        order_number: Some(order.order_number.clone()),
                    },
                );
            }
            _ => {}
        }
        Ok(order)
    }

    pub fn start_preparing(&self, order_id: i64) -> AppResult<Order> {
        self.change_status(order_id, OrderStatus::Preparing)
    }

    pub fn mark_ready(&self, order_id: i64) -> AppResult<Order> {
        self.change_status(order_id, OrderStatus::Ready)
    }

    pub fn complete(&self, order_id: i64) -> AppResult<Order> {
        self.change_status(order_id, OrderStatus::Completed)
    }

    pub fn cancel(&self, order_id: i64) -> AppResult<Order> {
        self.change_status(order_id, OrderStatus::Cancelled)
    }

    /// 小票文本；读取明细失败时返回 None (不打印)
    fn render_receipt(&self, order: &Order) -> Option<String> {
        match self.lifecycle.get_order_items(order.id) {
            Ok(items) => Some(self.receipts.render(order, &items)),
            Err(e) => {
                tracing::warn!(order_id = order.id, error = %e, "Receipt skipped, items unavailable");
                None
            }
        }
    }

    fn emit<T: Serialize>(&self, event_type: EventType, payload: &T) {
        match self.bus.publish_typed(event_type, payload) {
            Ok(report) if report.failed > 0 => {
                tracing::warn!(
                    event_type = %event_type,
                    delivered = report.delivered,
                    failed = report.failed,
                    "Some subscribers failed"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(event_type = %event_type, error = %e, "Failed to encode event payload");
            }
        }
    }
}
