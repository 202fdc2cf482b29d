//! Hardware registry
//!
//! 按名字持有全部外设，统一连接 / 断开 / 查询状态。
//!
//! | 名字 | 设备 |
//! |------|------|
//! | `receipt_printer` | [`ReceiptPrinter`] |
//! | `kitchen_printer` | [`KitchenPrinter`] |
//! | `kitchen_display` | [`KitchenDisplaySystem`] |
//! | `customer_display` | [`CustomerDisplay`] |

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;

use chrono_tz::Tz;
use shared::message::EventType;

use super::{
    CustomerDisplay, Display, KitchenDisplaySystem, KitchenPrinter, Peripheral,
    PeripheralStatus, Printer, ReceiptPrinter, detach,
};
use crate::message::{EventBus, EventHandler};
use crate::printing::KitchenTicketRenderer;
use crate::printing::renderer::DEFAULT_WIDTH;

pub const RECEIPT_PRINTER: &str = "receipt_printer";
pub const KITCHEN_PRINTER: &str = "kitchen_printer";
pub const KITCHEN_DISPLAY: &str = "kitchen_display";
pub const CUSTOMER_DISPLAY: &str = "customer_display";

/// 外设配置
#[derive(Debug, Clone)]
pub struct HardwareConfig {
    pub receipt_printer_name: String,
    pub kitchen_printer_name: String,
    pub kitchen_display_name: String,
    pub customer_display_name: String,
    /// 打印文件输出目录
    pub output_dir: PathBuf,
    /// 厨房单时间戳所用时区
    pub timezone: Tz,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            receipt_printer_name: String::new(),
            kitchen_printer_name: String::new(),
            kitchen_display_name: String::new(),
            customer_display_name: String::new(),
            output_dir: PathBuf::from("receipts"),
            timezone: Tz::UTC,
        }
    }
}

impl HardwareConfig {
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }
}

/// A registered device plus the bus subscriptions it holds
struct Entry {
    device: Arc<dyn Peripheral>,
    subscription: Option<(Arc<dyn EventHandler>, &'static [EventType])>,
}

#[derive(Default)]
pub struct HardwareRegistry {
    devices: BTreeMap<String, Entry>,
    receipt_printer: Option<Arc<ReceiptPrinter>>,
    kitchen_printer: Option<Arc<KitchenPrinter>>,
    kitchen_display: Option<Arc<KitchenDisplaySystem>>,
    customer_display: Option<Arc<CustomerDisplay>>,
    bus: Option<Arc<EventBus>>,
}

impl HardwareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the four standard peripherals and subscribe them to `bus`
    ///
    /// Calling again replaces the previous set; the old devices are
    /// unsubscribed first so no event is handled twice.
    pub fn initialize(&mut self, config: &HardwareConfig, bus: &Arc<EventBus>) {
        self.release(bus);

        let receipt = ReceiptPrinter::new(
            config.receipt_printer_name.clone(),
            config.output_dir.clone(),
            bus,
        );
        let kitchen = KitchenPrinter::new(
            config.kitchen_printer_name.clone(),
            config.output_dir.clone(),
            KitchenTicketRenderer::new(DEFAULT_WIDTH, config.timezone),
            bus,
        );
        let kds = KitchenDisplaySystem::new(config.kitchen_display_name.clone(), bus);
        let customer = CustomerDisplay::new(config.customer_display_name.clone(), bus);

        self.insert_subscribed(RECEIPT_PRINTER, receipt.clone(), ReceiptPrinter::SUBSCRIPTIONS);
        self.insert_subscribed(KITCHEN_PRINTER, kitchen.clone(), KitchenPrinter::SUBSCRIPTIONS);
        self.insert_subscribed(KITCHEN_DISPLAY, kds.clone(), KitchenDisplaySystem::SUBSCRIPTIONS);
        self.insert_subscribed(CUSTOMER_DISPLAY, customer.clone(), CustomerDisplay::SUBSCRIPTIONS);

        self.receipt_printer = Some(receipt);
        self.kitchen_printer = Some(kitchen);
        self.kitchen_display = Some(kds);
        self.customer_display = Some(customer);
        self.bus = Some(bus.clone());

        tracing::info!(
            devices = self.devices.len(),
            output_dir = %config.output_dir.display(),
            "Hardware initialized"
        );
    }

    /// Register an extra device under `name`, replacing any device with that name
    pub fn register(&mut self, name: impl Into<String>, device: Arc<dyn Peripheral>) {
        let name = name.into();
        tracing::debug!(device = %name, "Peripheral registered");
        self.devices.insert(
            name,
            Entry {
                device,
                subscription: None,
            },
        );
    }

    fn insert_subscribed<T>(&mut self, name: &str, device: Arc<T>, events: &'static [EventType])
    where
        T: Peripheral + EventHandler + 'static,
    {
        let handler: Arc<dyn EventHandler> = device.clone();
        self.devices.insert(
            name.to_string(),
            Entry {
                device,
                subscription: Some((handler, events)),
            },
        );
    }

    /// Unsubscribe and drop every device built by a previous `initialize`
    fn release(&mut self, bus: &EventBus) {
        let previous = self.bus.take();
        for entry in self.devices.values() {
            if let Some((handler, events)) = &entry.subscription {
                detach(previous.as_deref().unwrap_or(bus), handler, events);
            }
        }
        self.devices.retain(|_, e| e.subscription.is_none());
        self.receipt_printer = None;
        self.kitchen_printer = None;
        self.kitchen_display = None;
        self.customer_display = None;
    }

    /// Connect every device; name → connected
    ///
    /// 单个设备失败 (含 panic) 只记录日志，不影响其他设备。
    pub fn connect_all(&self) -> BTreeMap<String, bool> {
        self.devices
            .iter()
            .map(|(name, entry)| {
                let outcome = catch_unwind(AssertUnwindSafe(|| entry.device.connect()));
                let connected = match outcome {
                    Ok(Ok(())) => true,
                    Ok(Err(e)) => {
                        tracing::error!(device = %name, error = %e, "Failed to connect device");
                        false
                    }
                    Err(_) => {
                        tracing::error!(device = %name, "Device panicked while connecting");
                        false
                    }
                };
                (name.clone(), connected)
            })
            .collect()
    }

    /// Disconnect every device, best effort
    pub fn disconnect_all(&self) {
        for (name, entry) in &self.devices {
            match catch_unwind(AssertUnwindSafe(|| entry.device.disconnect())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(device = %name, error = %e, "Failed to disconnect device");
                }
                Err(_) => {
                    tracing::error!(device = %name, "Device panicked while disconnecting");
                }
            }
        }
    }

    pub fn get_all_status(&self) -> BTreeMap<String, PeripheralStatus> {
        self.devices
            .iter()
            .map(|(name, entry)| (name.clone(), entry.device.status()))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Peripheral>> {
        self.devices.get(name).map(|e| e.device.clone())
    }

    pub fn receipt_printer(&self) -> Option<&Arc<ReceiptPrinter>> {
        self.receipt_printer.as_ref()
    }

    pub fn kitchen_printer(&self) -> Option<&Arc<KitchenPrinter>> {
        self.kitchen_printer.as_ref()
    }

    pub fn kitchen_display(&self) -> Option<&Arc<KitchenDisplaySystem>> {
        self.kitchen_display.as_ref()
    }

    pub fn customer_display(&self) -> Option<&Arc<CustomerDisplay>> {
        self.customer_display.as_ref()
    }

    /// Standard printers, as capabilities
    pub fn printers(&self) -> Vec<Arc<dyn Printer>> {
        let mut printers: Vec<Arc<dyn Printer>> = Vec::new();
        if let Some(p) = &self.receipt_printer {
            printers.push(p.clone());
        }
        if let Some(p) = &self.kitchen_printer {
            printers.push(p.clone());
        }
        printers
    }

    /// Standard displays, as capabilities
    pub fn displays(&self) -> Vec<Arc<dyn Display>> {
        let mut displays: Vec<Arc<dyn Display>> = Vec::new();
        if let Some(d) = &self.kitchen_display {
            displays.push(d.clone());
        }
        if let Some(d) = &self.customer_display {
            displays.push(d.clone());
        }
        displays
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl std::fmt::Debug for HardwareRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareRegistry")
            .field("devices", &self.devices.keys().collect::<Vec<_>>())
            .finish()
    }
}
