//! Receipt printer
//!
//! Prints the `receipt_text` carried by `order_completed` events.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use shared::message::{BusEvent, EventType, OrderCompletedPayload};

use super::file_printer::FilePrinter;
use super::{HardwareResult, Peripheral, PeripheralKind, Printer, attach};
use crate::message::{EventBus, EventHandler, HandlerError, HandlerResult};

const DEFAULT_NAME: &str = "Receipt Printer";

/// Artifact file prefix
pub const RECEIPT_PREFIX: &str = "receipt";

pub struct ReceiptPrinter {
    core: FilePrinter,
}

impl ReceiptPrinter {
    pub const SUBSCRIPTIONS: &'static [EventType] = &[EventType::OrderCompleted];

    /// Create the printer and subscribe it to `bus`
    pub fn new(name: impl Into<String>, output_dir: impl Into<PathBuf>, bus: &EventBus) -> Arc<Self> {
        let printer = Arc::new(Self::detached(name, output_dir));
        attach(bus, printer.clone(), Self::SUBSCRIPTIONS);
        printer
    }

    /// Create the printer without any bus subscription
    pub fn detached(name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let name = if name.is_empty() {
            DEFAULT_NAME.to_string()
        } else {
            name
        };
        Self {
            core: FilePrinter::new(name, output_dir.into(), RECEIPT_PREFIX),
        }
    }

    pub fn output_dir(&self) -> &Path {
        self.core.output_dir()
    }
}

impl Peripheral for ReceiptPrinter {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn kind(&self) -> PeripheralKind {
        PeripheralKind::ReceiptPrinter
    }

    fn is_connected(&self) -> bool {
        self.core.is_connected()
    }

    fn connect(&self) -> HardwareResult<()> {
        self.core.connect()
    }

    fn disconnect(&self) -> HardwareResult<()> {
        self.core.disconnect();
        Ok(())
    }
}

impl Printer for ReceiptPrinter {
    fn print_content(&self, content: &str) -> HardwareResult<PathBuf> {
        self.core.print(content)
    }
}

impl EventHandler for ReceiptPrinter {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn handle(&self, event: &BusEvent) -> HandlerResult {
        let payload: OrderCompletedPayload = event
            .parse()
            .map_err(|e| HandlerError::payload(&event.event_type, e))?;

        match payload.receipt_text.as_deref().filter(|t| !t.is_empty()) {
            Some(text) => {
                if let Err(e) = self.print_content(text) {
                    tracing::warn!(
                        order_number = %payload.order_number,
                        error = %e,
                        "Receipt not printed"
                    );
                }
            }
            None => {
                tracing::debug!(order_number = %payload.order_number, "No receipt text, skipping");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::HardwareError;

    fn completed(receipt: Option<&str>) -> OrderCompletedPayload {
        OrderCompletedPayload {
            order_id: 1,
            order_number: "ORD1".to_string(),
            receipt_text: receipt.map(str::to_string),
        }
    }

    fn files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .map(|rd| rd.map(|e| e.unwrap().path()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_prints_receipt_on_completion() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("receipts");
        let bus = EventBus::new();
        let printer = ReceiptPrinter::new("", &out, &bus);
        printer.connect().unwrap();

        bus.publish_typed(
            EventType::OrderCompleted,
            &completed(Some("*** RECEIPT ***\nTotal: $10.00")),
        )
        .unwrap();

        let files = files(&out);
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("receipt_"));
        assert_eq!(
            std::fs::read_to_string(&files[0]).unwrap(),
            "*** RECEIPT ***\nTotal: $10.00"
        );
    }

    #[test]
    fn test_empty_receipt_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bus = EventBus::new();
        let printer = ReceiptPrinter::new("Front", dir.path(), &bus);
        printer.connect().unwrap();

        bus.publish_typed(EventType::OrderCompleted, &completed(None)).unwrap();
        bus.publish_typed(EventType::OrderCompleted, &completed(Some(""))).unwrap();
        assert!(files(dir.path()).is_empty());
    }

    #[test]
    fn test_disconnected_printer_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let printer = ReceiptPrinter::detached("", dir.path());

        let err = printer.print_content("hello").unwrap_err();
        assert!(matches!(err, HardwareError::NotConnected(name) if name == DEFAULT_NAME));
        assert!(files(dir.path()).is_empty());

        printer.connect().unwrap();
        printer.disconnect().unwrap();
        assert!(printer.print_content("hello").is_err());
    }

    #[test]
    fn test_connect_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a").join("b");
        let printer = ReceiptPrinter::detached("", &out);
        printer.connect().unwrap();
        assert!(out.is_dir());
        assert!(printer.status().is_connected);
    }
}
