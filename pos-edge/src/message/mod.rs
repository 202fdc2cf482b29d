//! 事件总线模块
//!
//! - [`EventBus`] - 同步发布/订阅总线
//! - [`EventHandler`] - 订阅者 trait
//!
//! 事件类型与 payload 定义在 `shared::message`。

pub mod bus;
pub mod handler;

pub use bus::{DispatchReport, EventBus};
pub use handler::{EventHandler, FnHandler, HandlerError, HandlerResult, handler_fn};
pub use shared::message::{BusEvent, EventType, Payload};
