use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::{BackgroundTasks, Config};
use crate::hardware::{HardwareRegistry, KitchenRefreshTask};
use crate::message::EventBus;
use crate::orders::{OrderFlow, OrderLifecycle, OrderStore, RedbOrderStore};
use crate::utils::{AppError, AppResult};

/// 组合根
///
/// 持有事件总线、订单存储、生命周期服务、流程编排和外设注册表。
/// 所有字段都是 `Arc`，clone 成本很低，可以在任务间传递。
///
/// | 字段 | 说明 |
/// |------|------|
/// | bus | 进程内事件总线 (显式实例，不使用全局单例) |
/// | store | 订单存储 (默认 redb) |
/// | lifecycle | 订单生命周期 |
/// | flow | 下单 / 状态流转 + 事件发布 |
/// | hardware | 外设注册表 |
#[derive(Clone)]
pub struct PosState {
    config: Config,
    bus: Arc<EventBus>,
    store: Arc<dyn OrderStore>,
    lifecycle: Arc<OrderLifecycle>,
    flow: Arc<OrderFlow>,
    hardware: Arc<HardwareRegistry>,
}

impl PosState {
    /// 初始化: 创建工作目录、打开 redb 存储、构建外设
    pub fn initialize(config: &Config) -> AppResult<Self> {
        std::fs::create_dir_all(&config.work_dir).map_err(|e| {
            AppError::config(format!(
                "Failed to create work directory {}: {}",
                config.work_dir, e
            ))
        })?;

        let store_path = config.store_path();
        let store = RedbOrderStore::open(&store_path)?;
        tracing::info!(path = %store_path.display(), "Order store opened");

        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// 使用指定存储构建 (测试用内存存储)
    pub fn with_store(config: &Config, store: Arc<dyn OrderStore>) -> Self {
        let bus = Arc::new(EventBus::new());

        let lifecycle = Arc::new(
            OrderLifecycle::new(store.clone())
                .with_policy(config.transition_policy())
                .with_timezone(config.timezone)
                .with_default_tax_rate(config.tax_rate),
        );
        let flow = Arc::new(OrderFlow::new(
            lifecycle.clone(),
            bus.clone(),
            config.receipt_renderer(),
        ));

        let mut hardware = HardwareRegistry::new();
        hardware.initialize(&config.hardware(), &bus);

        Self {
            config: config.clone(),
            bus,
            store,
            lifecycle,
            flow,
            hardware: Arc::new(hardware),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    pub fn lifecycle(&self) -> &Arc<OrderLifecycle> {
        &self.lifecycle
    }

    pub fn flow(&self) -> &Arc<OrderFlow> {
        &self.flow
    }

    pub fn hardware(&self) -> &Arc<HardwareRegistry> {
        &self.hardware
    }

    /// 连接所有外设，返回 name → 是否在线
    pub fn connect_hardware(&self) -> BTreeMap<String, bool> {
        let results = self.hardware.connect_all();
        let online = results.values().filter(|ok| **ok).count();
        tracing::info!(online, total = results.len(), "Hardware connected");
        results
    }

    /// 注册后台任务
    ///
    /// 当前只有 KDS 定时刷新 (interval 为 0 时不启动)。
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let (Some(interval), Some(display)) = (
            self.config.refresh_interval(),
            self.hardware.kitchen_display().cloned(),
        ) else {
            tracing::debug!("Kitchen refresh task disabled");
            return;
        };

        let refresh = KitchenRefreshTask::new(
            self.lifecycle.clone(),
            display,
            interval,
            tasks.shutdown_token(),
        );
        tasks.spawn("kitchen_refresh", refresh.run());
    }

    /// 停止后台任务并断开外设
    pub async fn shutdown(&self, tasks: BackgroundTasks) {
        tasks.shutdown().await;
        self.hardware.disconnect_all();
        tracing::info!("POS edge stopped");
    }
}
