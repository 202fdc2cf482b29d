use pos_edge::{BackgroundTasks, PosState, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv, 工作目录, 日志)
    let config = setup_environment()?;

    tracing::info!(work_dir = %config.work_dir, "POS edge starting...");

    // 2. 初始化组合根 (总线、存储、外设)
    let state = PosState::initialize(&config)?;

    // 3. 连接外设
    for (device, ok) in state.connect_hardware() {
        if !ok {
            tracing::warn!(device = %device, "Peripheral offline at startup");
        }
    }

    // 4. 后台任务
    let mut tasks = BackgroundTasks::new();
    state.start_background_tasks(&mut tasks);
    tracing::info!(tasks = ?tasks.names(), "Background tasks started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    state.shutdown(tasks).await;
    Ok(())
}
