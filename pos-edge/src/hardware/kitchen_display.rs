//! Kitchen display system (KDS)
//!
//! 维护厨房看板上的在制订单列表：
//!
//! | 事件 | 列表变化 | 推送 |
//! |------|----------|------|
//! | `order_created` | 追加 (status = pending) | `OrderAdded` |
//! | `order_status_changed` | 更新对应订单状态 | `StatusChanged` |
//! | `order_completed` / `order_cancelled` | 按 id 移除 | `OrderRemoved` |
//!
//! 列表在断开状态下也会更新，只有屏幕推送失败（记录日志）。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use shared::message::{
    BusEvent, EventType, OrderCreatedPayload, OrderStatusChangedPayload, TicketItem,
};
use shared::models::{Order, OrderItem, OrderStatus, OrderType};
use shared::util::now_millis;

use super::{
    Display, DisplayUpdate, HardwareError, HardwareResult, Peripheral, PeripheralKind, attach,
};
use crate::message::{EventBus, EventHandler, HandlerError, HandlerResult};

const DEFAULT_NAME: &str = "Kitchen Display";

/// 看板上的一张订单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveOrder {
    pub order_id: i64,
    pub order_number: String,
    pub order_type: OrderType,
    pub items: Vec<TicketItem>,
    pub status: OrderStatus,
    /// Unix millis (加入看板的时间)
    pub created_at: i64,
}

impl ActiveOrder {
    /// Board entry for a persisted order
    pub fn from_order(order: &Order, items: &[OrderItem]) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number.clone(),
            order_type: order.order_type,
            items: items
                .iter()
                .map(|i| TicketItem {
                    item_name: i.item_name.clone(),
                    quantity: i.quantity,
                    special_instructions: i.special_instructions.clone(),
                })
                .collect(),
            status: order.status,
            created_at: order.created_at,
        }
    }
}

/// Payload fields shared by `order_completed` and `order_cancelled`
#[derive(Deserialize)]
struct OrderRef {
    order_id: i64,
}

pub struct KitchenDisplaySystem {
    name: String,
    connected: AtomicBool,
    active_orders: Mutex<Vec<ActiveOrder>>,
    /// 最近一次成功推送到屏幕的内容
    last_update: RwLock<Option<DisplayUpdate>>,
}

impl KitchenDisplaySystem {
    pub const SUBSCRIPTIONS: &'static [EventType] = &[
        EventType::OrderCreated,
        EventType::OrderStatusChanged,
        EventType::OrderCompleted,
        EventType::OrderCancelled,
    ];

    /// Create the display and subscribe it to `bus`
    pub fn new(name: impl Into<String>, bus: &EventBus) -> Arc<Self> {
        let display = Arc::new(Self::detached(name));
        attach(bus, display.clone(), Self::SUBSCRIPTIONS);
        display
    }

    /// Create the display without any bus subscription
    pub fn detached(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: if name.is_empty() {
                DEFAULT_NAME.to_string()
            } else {
                name
            },
            connected: AtomicBool::new(false),
            active_orders: Mutex::new(Vec::new()),
            last_update: RwLock::new(None),
        }
    }

    /// 当前看板订单 (按加入顺序)
    pub fn get_active_orders(&self) -> Vec<ActiveOrder> {
        self.active_orders.lock().clone()
    }

    pub fn active_count(&self) -> usize {
        self.active_orders.lock().len()
    }

    pub fn find(&self, order_id: i64) -> Option<ActiveOrder> {
        self.active_orders
            .lock()
            .iter()
            .find(|o| o.order_id == order_id)
            .cloned()
    }

    pub fn last_update(&self) -> Option<DisplayUpdate> {
        self.last_update.read().clone()
    }

    fn push(&self, update: DisplayUpdate) {
        let action = update.action();
        if let Err(e) = self.update_content(update) {
            tracing::debug!(display = %self.name, action, error = %e, "KDS screen not updated");
        }
    }

    fn on_order_created(&self, event: &BusEvent) -> HandlerResult {
        let payload: OrderCreatedPayload = event
            .parse()
            .map_err(|e| HandlerError::payload(&event.event_type, e))?;

        let entry = ActiveOrder {
            order_id: payload.order_id,
            order_number: payload.order_number,
            order_type: payload.order_type,
            items: payload.items,
            status: OrderStatus::Pending,
            created_at: now_millis(),
        };

        {
            let mut orders = self.active_orders.lock();
            if orders.iter().any(|o| o.order_id == entry.order_id) {
                tracing::debug!(order_id = entry.order_id, "Order already on KDS board");
                return Ok(());
            }
            orders.push(entry.clone());
        }

        self.push(DisplayUpdate::OrderAdded { order: entry });
        Ok(())
    }

    fn on_status_changed(&self, event: &BusEvent) -> HandlerResult {
        let payload: OrderStatusChangedPayload = event
            .parse()
            .map_err(|e| HandlerError::payload(&event.event_type, e))?;

        let found = {
            let mut orders = self.active_orders.lock();
            match orders.iter_mut().find(|o| o.order_id == payload.order_id) {
                Some(order) => {
                    order.status = payload.new_status;
                    true
                }
                None => false,
            }
        };

        if found {
            self.push(DisplayUpdate::StatusChanged {
                order_id: payload.order_id,
                new_status: payload.new_status,
            });
        }
        Ok(())
    }

    fn on_order_finished(&self, event: &BusEvent) -> HandlerResult {
        let OrderRef { order_id } = event
            .parse()
            .map_err(|e| HandlerError::payload(&event.event_type, e))?;

        let removed = {
            let mut orders = self.active_orders.lock();
            let before = orders.len();
            orders.retain(|o| o.order_id != order_id);
            orders.len() != before
        };

        if removed {
            self.push(DisplayUpdate::OrderRemoved { order_id });
        }
        Ok(())
    }
}

impl Peripheral for KitchenDisplaySystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PeripheralKind {
        PeripheralKind::KitchenDisplay
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn connect(&self) -> HardwareResult<()> {
        self.connected.store(true, Ordering::Release);
        tracing::info!(display = %self.name, "Kitchen display connected");
        Ok(())
    }

    fn disconnect(&self) -> HardwareResult<()> {
        self.connected.store(false, Ordering::Release);
        tracing::info!(display = %self.name, "Kitchen display disconnected");
        Ok(())
    }
}

impl Display for KitchenDisplaySystem {
    fn update_content(&self, update: DisplayUpdate) -> HardwareResult<()> {
        if !self.is_connected() {
            return Err(HardwareError::NotConnected(self.name.clone()));
        }
        if matches!(update, DisplayUpdate::Message(_)) {
            return Err(HardwareError::Display(
                "kitchen display does not show customer messages".to_string(),
            ));
        }

        tracing::info!(display = %self.name, action = update.action(), "Kitchen display updated");
        *self.last_update.write() = Some(update);
        Ok(())
    }
}

impl EventHandler for KitchenDisplaySystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, event: &BusEvent) -> HandlerResult {
        match event.kind() {
            Some(EventType::OrderCreated) => self.on_order_created(event),
            Some(EventType::OrderStatusChanged) => self.on_status_changed(event),
            Some(EventType::OrderCompleted | EventType::OrderCancelled) => {
                self.on_order_finished(event)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::{OrderCancelledPayload, OrderCompletedPayload};

    fn created(order_id: i64) -> OrderCreatedPayload {
        OrderCreatedPayload {
            order_id,
            order_number: format!("ORD{}", order_id),
            order_type: OrderType::Takeout,
            items: vec![TicketItem {
                item_name: "Ramen".to_string(),
                quantity: 1,
                special_instructions: None,
            }],
            customer_name: None,
            kitchen_ticket: None,
        }
    }

    fn setup() -> (EventBus, Arc<KitchenDisplaySystem>) {
        let bus = EventBus::new();
        let kds = KitchenDisplaySystem::new("", &bus);
        (bus, kds)
    }

    #[test]
    fn test_board_follows_order_events() {
        let (bus, kds) = setup();
        kds.connect().unwrap();
        assert_eq!(Peripheral::name(kds.as_ref()), DEFAULT_NAME);

        bus.publish_typed(EventType::OrderCreated, &created(1)).unwrap();
        bus.publish_typed(EventType::OrderCreated, &created(2)).unwrap();
        assert_eq!(kds.active_count(), 2);
        assert_eq!(kds.find(1).unwrap().status, OrderStatus::Pending);

        bus.publish_typed(
            EventType::OrderStatusChanged,
            &OrderStatusChangedPayload {
                order_id: 1,
                order_number: "ORD1".to_string(),
                new_status: OrderStatus::Preparing,
                old_status: Some(OrderStatus::Pending),
            },
        )
        .unwrap();
        assert_eq!(kds.find(1).unwrap().status, OrderStatus::Preparing);
        assert!(matches!(
            kds.last_update(),
            Some(DisplayUpdate::StatusChanged { order_id: 1, .. })
        ));

        bus.publish_typed(
            EventType::OrderCompleted,
            &OrderCompletedPayload {
                order_id: 1,
                order_number: "ORD1".to_string(),
                receipt_text: None,
            },
        )
        .unwrap();
        bus.publish_typed(
            EventType::OrderCancelled,
            &OrderCancelledPayload {
                order_id: 2,
                order_number: None,
            },
        )
        .unwrap();
        assert_eq!(kds.active_count(), 0);
        assert_eq!(
            kds.last_update(),
            Some(DisplayUpdate::OrderRemoved { order_id: 2 })
        );
    }

    #[test]
    fn test_removal_is_idempotent() {
        let (bus, kds) = setup();
        bus.publish_typed(EventType::OrderCreated, &created(1)).unwrap();

        let cancel = OrderCancelledPayload {
            order_id: 1,
            order_number: None,
        };
        bus.publish_typed(EventType::OrderCancelled, &cancel).unwrap();
        let report = bus.publish_typed(EventType::OrderCancelled, &cancel).unwrap();
        assert_eq!(report.failed, 0);
        assert_eq!(kds.active_count(), 0);
    }

    #[test]
    fn test_list_updates_while_disconnected() {
        let (bus, kds) = setup();
        bus.publish_typed(EventType::OrderCreated, &created(7)).unwrap();

        assert_eq!(kds.active_count(), 1);
        assert!(kds.last_update().is_none());
        assert!(matches!(
            kds.update_content(DisplayUpdate::Board { orders: vec![] }),
            Err(HardwareError::NotConnected(_))
        ));
    }

    #[test]
    fn test_duplicate_create_is_ignored() {
        let (bus, kds) = setup();
        bus.publish_typed(EventType::OrderCreated, &created(3)).unwrap();
        bus.publish_typed(EventType::OrderCreated, &created(3)).unwrap();
        assert_eq!(kds.active_count(), 1);
    }

    #[test]
    fn test_malformed_payload_is_reported_to_bus() {
        let (bus, kds) = setup();
        let report = bus.publish(EventType::OrderCreated, Default::default());
        assert_eq!(report.failed, 1);
        assert_eq!(kds.active_count(), 0);
    }
}
