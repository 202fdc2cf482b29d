//! 外设抽象层
//!
//! # 能力模型
//!
//! ```text
//!                Peripheral (name / connect / disconnect / status)
//!                     │
//!          ┌──────────┴──────────┐
//!          ▼                     ▼
//!      Printer                Display
//!   print_content()        update_content()
//!    │          │            │             │
//! Receipt    Kitchen      Kitchen       Customer
//! Printer    Printer      Display        Display
//! ```
//!
//! 每个外设在构造时向 [`EventBus`](crate::message::EventBus) 订阅自己关心的事件；
//! 总线持有外设的 `Arc`，外设不持有总线。
//!
//! 断开状态下的动作方法返回 [`HardwareError::NotConnected`]，从不 panic。

use std::path::PathBuf;
use std::sync::Arc;

use pos_printer::PrintError;
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::message::EventType;
use thiserror::Error;

use crate::message::{EventBus, EventHandler};

pub mod customer_display;
mod file_printer;
pub mod kitchen_display;
pub mod kitchen_printer;
pub mod receipt_printer;
pub mod refresh;
pub mod registry;

pub use customer_display::{CustomerDisplay, CustomerMessage};
pub use kitchen_display::{ActiveOrder, KitchenDisplaySystem};
pub use kitchen_printer::KitchenPrinter;
pub use receipt_printer::ReceiptPrinter;
pub use refresh::KitchenRefreshTask;
pub use registry::{HardwareConfig, HardwareRegistry};

/// Hardware errors
#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("{0} is not connected")]
    NotConnected(String),

    #[error("Print failed: {0}")]
    Print(#[from] PrintError),

    #[error("Display update rejected: {0}")]
    Display(String),

    #[error("Connection to {device} failed: {reason}")]
    Connection { device: String, reason: String },
}

pub type HardwareResult<T> = Result<T, HardwareError>;

impl From<HardwareError> for AppError {
    fn from(err: HardwareError) -> Self {
        let code = match &err {
            HardwareError::NotConnected(_) => ErrorCode::DeviceNotConnected,
            HardwareError::Print(PrintError::Offline(_)) => ErrorCode::PrinterNotAvailable,
            HardwareError::Print(_) => ErrorCode::PrintFailed,
            HardwareError::Display(_) => ErrorCode::DisplayFailed,
            HardwareError::Connection { .. } => ErrorCode::DeviceNotConnected,
        };
        AppError::with_message(code, err.to_string())
    }
}

/// 外设种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeripheralKind {
    ReceiptPrinter,
    KitchenPrinter,
    KitchenDisplay,
    CustomerDisplay,
    /// 自定义外设 (registry 外部注册)
    Other,
}

/// 外设状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeripheralStatus {
    pub name: String,
    pub kind: PeripheralKind,
    pub is_connected: bool,
}

/// Base capability shared by every device
pub trait Peripheral: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> PeripheralKind;

    fn is_connected(&self) -> bool;

    /// Bring the device online; idempotent
    fn connect(&self) -> HardwareResult<()>;

    /// Take the device offline; idempotent
    fn disconnect(&self) -> HardwareResult<()>;

    fn status(&self) -> PeripheralStatus {
        PeripheralStatus {
            name: self.name().to_string(),
            kind: self.kind(),
            is_connected: self.is_connected(),
        }
    }
}

/// Devices that turn text into a printed artifact
pub trait Printer: Peripheral {
    /// Print `content` verbatim; returns where the artifact was written
    fn print_content(&self, content: &str) -> HardwareResult<PathBuf>;
}

/// Devices that render screen content
pub trait Display: Peripheral {
    fn update_content(&self, update: DisplayUpdate) -> HardwareResult<()>;
}

/// Screen update pushed to a [`Display`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DisplayUpdate {
    /// KDS: order added to the board
    OrderAdded { order: ActiveOrder },
    /// KDS: status of a listed order changed
    StatusChanged {
        order_id: i64,
        new_status: shared::models::OrderStatus,
    },
    /// KDS: order left the board
    OrderRemoved { order_id: i64 },
    /// KDS: full board redraw
    Board { orders: Vec<ActiveOrder> },
    /// Customer display text
    Message(CustomerMessage),
}

impl DisplayUpdate {
    pub fn action(&self) -> &'static str {
        match self {
            Self::OrderAdded { .. } => "order_added",
            Self::StatusChanged { .. } => "status_changed",
            Self::OrderRemoved { .. } => "order_removed",
            Self::Board { .. } => "board",
            Self::Message(_) => "message",
        }
    }
}

/// Subscribe `handler` to each of `event_types`
pub(crate) fn attach(bus: &EventBus, handler: Arc<dyn EventHandler>, event_types: &[EventType]) {
    for event_type in event_types {
        bus.subscribe(event_type, handler.clone());
    }
}

/// Undo [`attach`]
pub(crate) fn detach(bus: &EventBus, handler: &Arc<dyn EventHandler>, event_types: &[EventType]) {
    for event_type in event_types {
        bus.unsubscribe(event_type, handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_error_codes() {
        let err: AppError = HardwareError::NotConnected("Receipt Printer".into()).into();
        assert_eq!(err.code, ErrorCode::DeviceNotConnected);
        assert_eq!(err.message, "Receipt Printer is not connected");

        let err: AppError = HardwareError::Print(PrintError::Offline("receipts".into())).into();
        assert_eq!(err.code, ErrorCode::PrinterNotAvailable);

        let err: AppError = HardwareError::Display("bad update".into()).into();
        assert_eq!(err.code, ErrorCode::DisplayFailed);
    }

    #[test]
    fn test_display_update_serializes_with_action_tag() {
        let update = DisplayUpdate::OrderRemoved { order_id: 9 };
        assert_eq!(update.action(), "order_removed");
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["action"], "order_removed");
        assert_eq!(json["order_id"], 9);
    }
}
