//! 厨房看板定时刷新
//!
//! 周期性读取待制作订单 (`pending` / `preparing`) 并整屏推送到 KDS。
//! 由 `PosState::start_background_tasks()` 注册为后台任务。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{ActiveOrder, Display, DisplayUpdate, KitchenDisplaySystem};
use crate::orders::OrderLifecycle;
use crate::utils::AppResult;

pub struct KitchenRefreshTask {
    lifecycle: Arc<OrderLifecycle>,
    display: Arc<KitchenDisplaySystem>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl KitchenRefreshTask {
    pub fn new(
        lifecycle: Arc<OrderLifecycle>,
        display: Arc<KitchenDisplaySystem>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            lifecycle,
            display,
            interval,
            shutdown,
        }
    }

    /// Push the current kitchen queue to the display; returns the order count
    pub fn refresh_once(&self) -> AppResult<usize> {
        let pending = self.lifecycle.get_pending_orders()?;
        let mut board = Vec::with_capacity(pending.len());
        for order in &pending {
            let items = self.lifecycle.get_order_items(order.id)?;
            board.push(ActiveOrder::from_order(order, &items));
        }

        let count = board.len();
        self.display
            .update_content(DisplayUpdate::Board { orders: board })?;
        Ok(count)
    }

    /// 主循环：立即刷新一次，之后按 interval 触发，直到 shutdown
    pub async fn run(self) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Kitchen refresh task started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.refresh_once() {
                        Ok(count) => tracing::trace!(orders = count, "Kitchen board refreshed"),
                        Err(e) => tracing::debug!(error = %e, "Kitchen board refresh skipped"),
                    }
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Kitchen refresh task received shutdown signal");
                    break;
                }
            }
        }

        tracing::info!("Kitchen refresh task stopped");
    }
}
