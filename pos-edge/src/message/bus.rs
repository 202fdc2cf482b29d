//! 事件总线核心实现
//!
//! # 架构
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        EventBus                           │
//! │  RwLock<HashMap<event_type, Vec<Arc<dyn EventHandler>>>>  │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │ publish(): snapshot → unlock → dispatch
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//!     handler #1          handler #2          handler #3
//!   (Err / panic 被捕获并记录，不影响后续订阅者)
//! ```
//!
//! # 语义
//!
//! - 同一 (事件类型, 订阅者) 只登记一次，订阅者身份为 `Arc` 数据指针
//! - 分发在发布者线程上同步执行，按注册顺序
//! - 分发前复制订阅者快照；分发期间的订阅/退订只影响下一次发布
//! - 发布者永远不会收到订阅者的错误

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, const_mutex};
use serde::Serialize;
use shared::message::{BusEvent, Payload};

use super::handler::EventHandler;

type HandlerList = Vec<Arc<dyn EventHandler>>;

/// 进程级共享总线 (仅供无法注入实例的调用方与测试隔离使用)
static GLOBAL_BUS: Mutex<Option<Arc<EventBus>>> = const_mutex(None);

/// Outcome of one publish, for diagnostics only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that returned `Ok`
    pub delivered: usize,
    /// Handlers that returned `Err` or panicked
    pub failed: usize,
}

impl DispatchReport {
    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }
}

/// 进程内事件总线
///
/// 通过 `Arc<EventBus>` 在组件间共享。
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<HashMap<String, HandlerList>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lazily created process-wide bus
    pub fn global() -> Arc<EventBus> {
        GLOBAL_BUS
            .lock()
            .get_or_insert_with(|| Arc::new(EventBus::new()))
            .clone()
    }

    /// Drop the process-wide bus and its subscriptions
    ///
    /// The next [`EventBus::global`] call creates a fresh instance.
    pub fn reset_global() {
        if let Some(bus) = GLOBAL_BUS.lock().take() {
            bus.clear();
        }
    }

    /// 订阅事件
    ///
    /// Subscribing the same handler twice for the same type is a no-op.
    pub fn subscribe(&self, event_type: impl AsRef<str>, handler: Arc<dyn EventHandler>) {
        let event_type = event_type.as_ref();
        let mut subscribers = self.subscribers.write();
        let list = subscribers.entry(event_type.to_string()).or_default();

        if list.iter().any(|h| same_handler(h, &handler)) {
            tracing::debug!(event_type = %event_type, handler = handler.name(), "Already subscribed");
            return;
        }

        tracing::debug!(event_type = %event_type, handler = handler.name(), "Subscribed");
        list.push(handler);
    }

    /// 退订事件
    ///
    /// Returns whether the handler was registered. Absent handlers are not an error.
    pub fn unsubscribe(&self, event_type: impl AsRef<str>, handler: &Arc<dyn EventHandler>) -> bool {
        let event_type = event_type.as_ref();
        let mut subscribers = self.subscribers.write();
        let Some(list) = subscribers.get_mut(event_type) else {
            return false;
        };

        let before = list.len();
        list.retain(|h| !same_handler(h, handler));
        let removed = list.len() != before;
        if list.is_empty() {
            subscribers.remove(event_type);
        }

        if removed {
            tracing::debug!(event_type = %event_type, handler = handler.name(), "Unsubscribed");
        }
        removed
    }

    /// Whether `handler` is currently registered for `event_type`
    pub fn is_subscribed(&self, event_type: impl AsRef<str>, handler: &Arc<dyn EventHandler>) -> bool {
        self.subscribers
            .read()
            .get(event_type.as_ref())
            .is_some_and(|list| list.iter().any(|h| same_handler(h, handler)))
    }

    /// 发布事件
    pub fn publish(&self, event_type: impl AsRef<str>, payload: Payload) -> DispatchReport {
        self.publish_event(&BusEvent::new(event_type, payload))
    }

    /// 发布类型化 payload
    ///
    /// Fails only if `payload` does not serialize to a JSON object; in that
    /// case nothing is dispatched.
    pub fn publish_typed<T: Serialize>(
        &self,
        event_type: impl AsRef<str>,
        payload: &T,
    ) -> Result<DispatchReport, serde_json::Error> {
        let event = BusEvent::from_payload(event_type, payload)?;
        Ok(self.publish_event(&event))
    }

    /// 分发已构造的事件
    pub fn publish_event(&self, event: &BusEvent) -> DispatchReport {
        let snapshot: HandlerList = self
            .subscribers
            .read()
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        let mut report = DispatchReport::default();
        if snapshot.is_empty() {
            tracing::trace!(event_type = %event.event_type, "No subscribers");
            return report;
        }

        for handler in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::error!(
                        event_type = %event.event_type,
                        handler = handler.name(),
                        error = %e,
                        "Error in event handler"
                    );
                }
                Err(panic_info) => {
                    report.failed += 1;
                    tracing::error!(
                        event_type = %event.event_type,
                        handler = handler.name(),
                        panic = %panic_message(panic_info.as_ref()),
                        "Event handler panicked"
                    );
                }
            }
        }

        tracing::debug!(
            event_type = %event.event_type,
            delivered = report.delivered,
            failed = report.failed,
            "Event dispatched"
        );
        report
    }

    /// 清空所有订阅
    pub fn clear(&self) {
        self.subscribers.write().clear();
        tracing::debug!("All subscriptions cleared");
    }

    pub fn subscriber_count(&self, event_type: impl AsRef<str>) -> usize {
        self.subscribers
            .read()
            .get(event_type.as_ref())
            .map_or(0, Vec::len)
    }

    /// Event types with at least one subscriber, sorted
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.subscribers.read().keys().cloned().collect();
        types.sort();
        types
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self.subscribers.read();
        let counts: HashMap<&str, usize> = subscribers
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();
        f.debug_struct("EventBus").field("subscribers", &counts).finish()
    }
}

fn same_handler(a: &Arc<dyn EventHandler>, b: &Arc<dyn EventHandler>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

pub(crate) fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
