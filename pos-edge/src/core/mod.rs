//! 核心模块 - 配置、组合根和后台任务
//!
//! # 模块结构
//!
//! - [`Config`] - 门店节点配置
//! - [`PosState`] - 组合根 (总线、存储、外设)
//! - [`BackgroundTasks`] - 后台任务管理

pub mod config;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use state::PosState;
pub use tasks::BackgroundTasks;
