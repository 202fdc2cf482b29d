//! 订单模块
//!
//! - **lifecycle**: 下单 / 状态流转 / 查询 / 销售汇总 (不发布事件)
//! - **flow**: 生命周期 + 事件总线，落库成功后发布订单事件
//! - **money**: `rust_decimal` 金额计算
//! - **storage**: [`OrderStore`] 存储契约 + 内存实现
//! - **redb_store**: redb 持久化实现
//!
//! # Data Flow
//!
//! ```text
//! CreateOrderRequest → OrderFlow → OrderLifecycle → OrderStore
//!                         │
//!                         └──▶ EventBus ──▶ printers / displays
//! ```

pub mod flow;
pub mod lifecycle;
pub mod money;
pub mod redb_store;
pub mod storage;

pub use flow::OrderFlow;
pub use lifecycle::{
    CreateOrderRequest, CreatedOrder, DEFAULT_TAX_RATE, NewOrderItem, OrderLifecycle,
    OrderNumberGenerator, TransitionPolicy,
};
pub use money::OrderTotals;
pub use redb_store::RedbOrderStore;
pub use storage::{MemoryOrderStore, OrderStore, StorageError, StorageResult};
