//! POS Edge - 门店 POS 协调核心
//!
//! # 架构概述
//!
//! 本 crate 把订单生命周期、进程内事件总线和外设抽象层串在一起：
//!
//! - **事件总线** (`message`): 同步发布/订阅，按注册顺序分发，订阅者故障隔离
//! - **订单** (`orders`): 订单创建、状态机、销售汇总，持久化通过 [`OrderStore`] 接入
//! - **外设** (`hardware`): 小票打印机、厨房打印机、厨房显示屏 (KDS)、顾客显示屏
//! - **打印排版** (`printing`): 厨房单 / 小票纯文本排版
//!
//! # 模块结构
//!
//! ```text
//! pos-edge/src/
//! ├── core/          # 配置、组合根、后台任务
//! ├── message/       # 事件总线
//! ├── orders/        # 订单生命周期、存储、流程编排
//! ├── hardware/      # 外设与注册表
//! ├── printing/      # 票据排版
//! └── utils/         # 日志、时间、校验
//! ```
//!
//! # 事件流
//!
//! ```text
//! OrderFlow ──create_order──▶ OrderLifecycle ──▶ OrderStore
//!     │
//!     └──publish──▶ EventBus ──▶ KitchenPrinter / KitchenDisplaySystem
//!                            ──▶ CustomerDisplay / ReceiptPrinter
//! ```

pub mod core;
pub mod hardware;
pub mod message;
pub mod orders;
pub mod printing;
pub mod utils;

// Re-export 公共类型
pub use core::{BackgroundTasks, Config, PosState};
pub use hardware::{
    CustomerDisplay, Display, DisplayUpdate, HardwareConfig, HardwareError, HardwareRegistry,
    KitchenDisplaySystem, KitchenPrinter, Peripheral, PeripheralStatus, Printer, ReceiptPrinter,
};
pub use message::{DispatchReport, EventBus, EventHandler, HandlerError};
pub use orders::{
    CreateOrderRequest, CreatedOrder, MemoryOrderStore, NewOrderItem, OrderFlow, OrderLifecycle,
    OrderStore, RedbOrderStore, TransitionPolicy,
};
pub use utils::{AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境: 加载 `.env`、创建工作目录、初始化日志
pub fn setup_environment() -> AppResult<Config> {
    dotenv::dotenv().ok();
    let config = Config::from_env();

    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir).map_err(|e| {
        AppError::config(format!(
            "Failed to create log directory {}: {}",
            log_dir.display(),
            e
        ))
    })?;
    init_logger_with_file(Some(config.log_level.as_str()), log_dir.to_str());

    Ok(config)
}
