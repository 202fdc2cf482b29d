use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::hardware::HardwareConfig;
use crate::orders::{DEFAULT_TAX_RATE, TransitionPolicy};
use crate::printing::renderer::DEFAULT_WIDTH;
use crate::printing::{CompanyInfo, ReceiptRenderer};
use crate::utils::time::parse_timezone;

/// 门店节点配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖 (`.env` 会先被加载)：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库、日志) |
/// | OUTPUT_DIR | receipts | 打印文件目录，相对路径基于 WORK_DIR |
/// | RECEIPT_PRINTER_NAME | "" | 小票打印机名称 |
/// | KITCHEN_PRINTER_NAME | "" | 厨房打印机名称 |
/// | TAX_RATE | 0.08 | 默认税率 |
/// | BUSINESS_TIMEZONE | UTC | 营业时区 |
/// | KITCHEN_REFRESH_INTERVAL_MS | 5000 | KDS 刷新间隔 (毫秒) |
/// | POS_STRICT_TRANSITIONS | false | 是否严格校验状态流转 |
/// | LOG_LEVEL | info | 日志级别 |
/// | COMPANY_NAME / COMPANY_ADDRESS / COMPANY_PHONE | 占位文本 | 小票抬头 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/pos TAX_RATE=0.1 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// 打印文件输出目录
    pub output_dir: String,
    pub receipt_printer_name: String,
    pub kitchen_printer_name: String,
    pub kitchen_display_name: String,
    pub customer_display_name: String,
    /// 下单默认税率，例如 0.08
    pub tax_rate: f64,
    /// 营业时区 (日期区间查询、票据时间)
    pub timezone: Tz,
    /// KDS 刷新间隔 (毫秒)，0 表示不启动刷新任务
    pub kitchen_refresh_interval_ms: u64,
    pub strict_transitions: bool,
    pub log_level: String,
    pub company_name: String,
    pub company_address: String,
    pub company_phone: String,
    /// 票据宽度 (字符)
    pub receipt_width: usize,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        let company = CompanyInfo::default();
        Self {
            work_dir: env_string("WORK_DIR", "./data"),
            output_dir: env_string("OUTPUT_DIR", "receipts"),
            receipt_printer_name: env_string("RECEIPT_PRINTER_NAME", ""),
            kitchen_printer_name: env_string("KITCHEN_PRINTER_NAME", ""),
            kitchen_display_name: env_string("KITCHEN_DISPLAY_NAME", ""),
            customer_display_name: env_string("CUSTOMER_DISPLAY_NAME", ""),
            tax_rate: env_or("TAX_RATE", DEFAULT_TAX_RATE),
            timezone: parse_timezone(&env_string("BUSINESS_TIMEZONE", "UTC")),
            kitchen_refresh_interval_ms: env_or("KITCHEN_REFRESH_INTERVAL_MS", 5000),
            strict_transitions: env_or("POS_STRICT_TRANSITIONS", false),
            log_level: env_string("LOG_LEVEL", "info"),
            company_name: env_string("COMPANY_NAME", &company.name),
            company_address: env_string("COMPANY_ADDRESS", &company.address),
            company_phone: env_string("COMPANY_PHONE", &company.phone),
            receipt_width: env_or("RECEIPT_WIDTH", DEFAULT_WIDTH),
        }
    }

    /// 使用自定义目录覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, output_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.output_dir = output_dir.into();
        config
    }

    /// 打印文件目录 (相对路径基于 `work_dir`)
    pub fn output_dir(&self) -> PathBuf {
        let dir = PathBuf::from(&self.output_dir);
        if dir.is_absolute() {
            dir
        } else {
            PathBuf::from(&self.work_dir).join(dir)
        }
    }

    /// 订单数据库文件
    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("pos.redb")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn hardware(&self) -> HardwareConfig {
        HardwareConfig {
            receipt_printer_name: self.receipt_printer_name.clone(),
            kitchen_printer_name: self.kitchen_printer_name.clone(),
            kitchen_display_name: self.kitchen_display_name.clone(),
            customer_display_name: self.customer_display_name.clone(),
            output_dir: self.output_dir(),
            timezone: self.timezone,
        }
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        if self.strict_transitions {
            TransitionPolicy::Strict
        } else {
            TransitionPolicy::Unchecked
        }
    }

    pub fn company(&self) -> CompanyInfo {
        CompanyInfo {
            name: self.company_name.clone(),
            address: self.company_address.clone(),
            phone: self.company_phone.clone(),
        }
    }

    /// `None` 表示不启动刷新任务
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.kitchen_refresh_interval_ms > 0)
            .then(|| Duration::from_millis(self.kitchen_refresh_interval_ms))
    }

    pub fn receipt_renderer(&self) -> ReceiptRenderer {
        ReceiptRenderer::new(self.receipt_width, self.timezone, self.company())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
