//! Customer-facing display
//!
//! Shows one line of order progress to the customer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared::message::{BusEvent, EventType, OrderCompletedPayload, OrderStatusChangedPayload};
use shared::models::OrderStatus;

use super::{
    Display, DisplayUpdate, HardwareError, HardwareResult, Peripheral, PeripheralKind, attach,
};
use crate::message::{EventBus, EventHandler, HandlerError, HandlerResult};

const DEFAULT_NAME: &str = "Customer Display";

/// 顾客屏当前内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerMessage {
    pub order_number: String,
    pub status: OrderStatus,
    pub message: String,
}

impl CustomerMessage {
    /// Message for a status change
    pub fn for_status(order_number: &str, status: OrderStatus) -> Self {
        let message = match status {
            OrderStatus::Pending => format!("Order {} received", order_number),
            OrderStatus::Preparing => format!("Order {} is being prepared", order_number),
            OrderStatus::Ready => format!("Order {} is ready for pickup!", order_number),
            other => format!("Order {}: {}", order_number, other),
        };
        Self {
            order_number: order_number.to_string(),
            status,
            message,
        }
    }

    /// Message shown once an order is completed
    pub fn completed(order_number: &str) -> Self {
        Self {
            order_number: order_number.to_string(),
            status: OrderStatus::Completed,
            message: format!("Order {} complete. Thank you!", order_number),
        }
    }
}

pub struct CustomerDisplay {
    name: String,
    connected: AtomicBool,
    current: RwLock<Option<CustomerMessage>>,
}

impl CustomerDisplay {
    pub const SUBSCRIPTIONS: &'static [EventType] =
        &[EventType::OrderStatusChanged, EventType::OrderCompleted];

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
            current: RwLock::new(None),
        }
    }

    pub fn current_content(&self) -> Option<CustomerMessage> {
        self.current.read().clone()
    }

    /// Text currently on screen
    pub fn current_message(&self) -> Option<String> {
        self.current.read().as_ref().map(|m| m.message.clone())
    }

    fn show(&self, message: CustomerMessage) {
        if let Err(e) = self.update_content(DisplayUpdate::Message(message)) {
            tracing::debug!(display = %self.name, error = %e, "Customer display not updated");
        }
    }
}

impl Peripheral for CustomerDisplay {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PeripheralKind {
        PeripheralKind::CustomerDisplay
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn connect(&self) -> HardwareResult<()> {
        self.connected.store(true, Ordering::Release);
        tracing::info!(display = %self.name, "Customer display connected");
        Ok(())
    }

    fn disconnect(&self) -> HardwareResult<()> {
        self.connected.store(false, Ordering::Release);
        tracing::info!(display = %self.name, "Customer display disconnected");
        Ok(())
    }
}

impl Display for CustomerDisplay {
    fn update_content(&self, update: DisplayUpdate) -> HardwareResult<()> {
        if !self.is_connected() {
            return Err(HardwareError::NotConnected(self.name.clone()));
        }
        let action = update.action();
        let DisplayUpdate::Message(message) = update else {
            return Err(HardwareError::Display(format!(
                "customer display cannot render '{}'",
                action
            )));
        };

        tracing::info!(display = %self.name, message = %message.message, "Customer display updated");
        *self.current.write() = Some(message);
        Ok(())
    }
}

impl EventHandler for CustomerDisplay {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, event: &BusEvent) -> HandlerResult {
        match event.kind() {
            Some(EventType::OrderStatusChanged) => {
                let payload: OrderStatusChangedPayload = event
                    .parse()
                    .map_err(|e| HandlerError::payload(&event.event_type, e))?;
                self.show(CustomerMessage::for_status(
                    &payload.order_number,
                    payload.new_status,
                ));
            }
            Some(EventType::OrderCompleted) => {
                let payload: OrderCompletedPayload = event
                    .parse()
                    .map_err(|e| HandlerError::payload(&event.event_type, e))?;
                self.show(CustomerMessage::completed(&payload.order_number));
            }
            _ => {}
        }
        Ok(())
    }
}
