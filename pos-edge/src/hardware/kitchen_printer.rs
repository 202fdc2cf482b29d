//! Kitchen printer
//!
//! Prints a ticket for every `order_created` event. A pre-formatted
//! `kitchen_ticket` in the payload is printed as is; otherwise the ticket is
//! rendered from the payload.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use shared::message::{BusEvent, EventType, OrderCreatedPayload};

use super::file_printer::FilePrinter;
use super::{HardwareResult, Peripheral, PeripheralKind, Printer, attach};
use crate::message::{EventBus, EventHandler, HandlerError, HandlerResult};
use crate::printing::KitchenTicketRenderer;

const DEFAULT_NAME: &str = "Kitchen Printer";

/// Artifact file prefix
pub const KITCHEN_PREFIX: &str = "kitchen";

pub struct KitchenPrinter {
    core: FilePrinter,
    renderer: KitchenTicketRenderer,
}

impl KitchenPrinter {
    pub const SUBSCRIPTIONS: &'static [EventType] = &[EventType::OrderCreated];

    /// Create the printer and subscribe it to `bus`
    pub fn new(
        name: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        renderer: KitchenTicketRenderer,
        bus: &EventBus,
    ) -> Arc<Self> {
        let printer = Arc::new(Self::detached(name, output_dir, renderer));
        attach(bus, printer.clone(), Self::SUBSCRIPTIONS);
        printer
    }

    /// Create the printer without any bus subscription
    pub fn detached(
        name: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        renderer: KitchenTicketRenderer,
    ) -> Self {
        let name = name.into();
        let name = if name.is_empty() {
            DEFAULT_NAME.to_string()
        } else {
            name
        };
        Self {
            core: FilePrinter::new(name, output_dir.into(), KITCHEN_PREFIX),
            renderer,
        }
    }

    pub fn output_dir(&self) -> &Path {
        self.core.output_dir()
    }

    /// Render the kitchen ticket for an `order_created` payload
    pub fn format_kitchen_ticket(&self, order: &OrderCreatedPayload) -> String {
        self.renderer.render(order)
    }
}

impl Peripheral for KitchenPrinter {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn kind(&self) -> PeripheralKind {
        PeripheralKind::KitchenPrinter
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

impl Printer for KitchenPrinter {
    fn print_content(&self, content: &str) -> HardwareResult<PathBuf> {
        self.core.print(content)
    }
}

impl EventHandler for KitchenPrinter {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn handle(&self, event: &BusEvent) -> HandlerResult {
        let payload: OrderCreatedPayload = event
            .parse()
            .map_err(|e| HandlerError::payload(&event.event_type, e))?;

        let ticket = match payload.kitchen_ticket.as_deref().filter(|t| !t.is_empty()) {
            Some(ticket) => ticket.to_string(),
            None => self.format_kitchen_ticket(&payload),
        };

        if let Err(e) = self.print_content(&ticket) {
            tracing::warn!(
                order_number = %payload.order_number,
                error = %e,
                "Kitchen ticket not printed"
            );
        }
        Ok(())
    }
}
