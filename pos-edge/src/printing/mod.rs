//! Ticket rendering
//!
//! Turns order data into the plain-text layouts sent to printer peripherals:
//! - Kitchen tickets: rendered by the kitchen printer when an `order_created`
//!   event carries no pre-formatted ticket
//! - Customer receipts: rendered by the order flow on completion

pub mod renderer;

pub use renderer::{CompanyInfo, KitchenTicketRenderer, ReceiptRenderer};
