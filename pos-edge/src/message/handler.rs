//! Event handler trait
//!
//! 订阅者实现 [`EventHandler`]，总线以 `Arc` 数据指针作为订阅者身份。
//! 处理失败返回 [`HandlerError`]，由总线记录日志后继续分发。

use std::sync::Arc;

use shared::message::BusEvent;
use thiserror::Error;

/// Handler failure (总线只记录，不向发布者传播)
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid payload for {event_type}: {source}")]
    Payload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn payload(event_type: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Payload {
            event_type: event_type.into(),
            source,
        }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

pub type HandlerResult = Result<(), HandlerError>;

/// 事件订阅者
///
/// Handlers run synchronously on the publishing thread and must not assume
/// any particular thread. A handler may publish further events or change
/// subscriptions; the bus registry lock is not held during dispatch.
pub trait EventHandler: Send + Sync {
    /// Name used in dispatch logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn handle(&self, event: &BusEvent) -> HandlerResult;
}

/// 闭包订阅者
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&BusEvent) -> HandlerResult + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&BusEvent) -> HandlerResult + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, event: &BusEvent) -> HandlerResult {
        (self.f)(event)
    }
}

/// Wrap a closure as a shareable subscriber
///
/// Keep the returned `Arc` to unsubscribe later: identity is the allocation,
/// not the closure body.
pub fn handler_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn EventHandler>
where
    F: Fn(&BusEvent) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(FnHandler::new(name, f))
}
