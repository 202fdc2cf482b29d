//! 事件总线消息类型定义
//!
//! 事件类型是开放的字符串命名空间；系统定义的固定词汇见 [`EventType`]。
//! 每种事件的 payload 是一个 JSON 对象，字段约定见 [`payload`] 模块。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub mod payload;
pub use payload::*;

/// Event payload: string-keyed mapping carried with every event
pub type Payload = Map<String, Value>;

/// 系统内置事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// 新订单 (触发厨房显示 + 厨房打印)
    OrderCreated,
    /// 订单状态变更 (触发显示刷新)
    OrderStatusChanged,
    /// 订单完成 (触发小票打印)
    OrderCompleted,
    /// 订单取消
    OrderCancelled,
    /// 菜品变更 (UI 刷新)
    MenuItemUpdated,
    /// 用户登录
    UserLoggedIn,
    /// 用户登出
    UserLoggedOut,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        Self::OrderCreated,
        Self::OrderStatusChanged,
        Self::OrderCompleted,
        Self::OrderCancelled,
        Self::MenuItemUpdated,
        Self::UserLoggedIn,
        Self::UserLoggedOut,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OrderCreated => "order_created",
            Self::OrderStatusChanged => "order_status_changed",
            Self::OrderCompleted => "order_completed",
            Self::OrderCancelled => "order_cancelled",
            Self::MenuItemUpdated => "menu_item_updated",
            Self::UserLoggedIn => "user_logged_in",
            Self::UserLoggedOut => "user_logged_out",
        }
    }

    /// Look up a built-in event type by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl AsRef<str> for EventType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 总线事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    /// 事件类型名 (开放命名空间)
    pub event_type: String,
    /// 事件数据
    #[serde(default)]
    pub payload: Payload,
    /// 发布时间 (Unix millis)
    pub timestamp: i64,
}

impl BusEvent {
    /// 创建事件
    pub fn new(event_type: impl AsRef<str>, payload: Payload) -> Self {
        Self {
            event_type: event_type.as_ref().to_string(),
            payload,
            timestamp: crate::util::now_millis(),
        }
    }

    /// 创建空 payload 事件
    pub fn empty(event_type: impl AsRef<str>) -> Self {
        Self::new(event_type, Payload::new())
    }

    /// 从类型化 payload 创建事件
    ///
    /// The payload must serialize to a JSON object.
    pub fn from_payload<T: Serialize>(
        event_type: impl AsRef<str>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(payload)? {
            Value::Object(map) => Ok(Self::new(event_type, map)),
            other => Err(serde::ser::Error::custom(format!(
                "event payload must be an object, got {}",
                other
            ))),
        }
    }

    /// 解析为类型化 payload
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.payload.clone()))
    }

    /// 内置事件类型 (自定义事件返回 None)
    pub fn kind(&self) -> Option<EventType> {
        EventType::from_name(&self.event_type)
    }

    /// Whether this event carries the given type name
    pub fn is(&self, event_type: impl AsRef<str>) -> bool {
        self.event_type == event_type.as_ref()
    }

    /// 读取字符串字段
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// 读取整数字段
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.payload.get(key).and_then(Value::as_i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderStatus;

    #[test]
    fn test_event_type_names() {
        assert_eq!(EventType::OrderCreated.as_str(), "order_created");
        assert_eq!(
            EventType::from_name("order_cancelled"),
            Some(EventType::OrderCancelled)
        );
        assert_eq!(EventType::from_name("table_moved"), None);
        assert_eq!(
            serde_json::to_string(&EventType::UserLoggedOut).unwrap(),
            "\"user_logged_out\""
        );
    }

    #[test]
    fn test_typed_payload_into_event() {
        let payload = OrderStatusChangedPayload {
            order_id: 7,
            order_number: "ORD1".to_string(),
            new_status: OrderStatus::Ready,
            old_status: Some(OrderStatus::Preparing),
        };
        let event = BusEvent::from_payload(EventType::OrderStatusChanged, &payload).unwrap();

        assert_eq!(event.kind(), Some(EventType::OrderStatusChanged));
        assert_eq!(event.get_i64("order_id"), Some(7));
        assert_eq!(event.get_str("new_status"), Some("ready"));

        let parsed: OrderStatusChangedPayload = event.parse().unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_non_object_payload_rejected() {
        assert!(BusEvent::from_payload("custom", &42).is_err());
    }

    #[test]
    fn test_custom_event_type() {
        let event = BusEvent::empty("shift_closed");
        assert!(event.kind().is_none());
        assert!(event.is("shift_closed"));
        assert!(event.payload.is_empty());
    }

    #[test]
    fn test_parse_missing_required_key_fails() {
        let event = BusEvent::empty(EventType::OrderCancelled);
        assert!(event.parse::<OrderCancelledPayload>().is_err());
    }
}
