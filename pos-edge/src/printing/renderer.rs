//! Kitchen ticket and receipt renderers
//!
//! Both renderers produce fixed-width plain text via [`TicketBuilder`].

use chrono_tz::Tz;
use pos_printer::{TicketBuilder, pad_text, text_width, truncate_text};
use shared::message::OrderCreatedPayload;
use shared::models::{Order, OrderItem, OrderType};

use crate::utils::time::format_millis;

/// Default paper width in characters
pub const DEFAULT_WIDTH: usize = 40;

/// Kitchen ticket renderer
///
/// ```text
/// ========================================
///              KITCHEN ORDER
/// ========================================
/// Order #: ORD1718000000000
/// Type:    dine_in
/// Time:    12:30:05
/// ----------------------------------------
///   2x  Burger
///        ** no onions
/// ========================================
/// ```
pub struct KitchenTicketRenderer {
    width: usize,
    timezone: Tz,
}

impl KitchenTicketRenderer {
    pub fn new(width: usize, timezone: Tz) -> Self {
        Self { width, timezone }
    }

    /// Render a kitchen ticket, stamped with the current time
    pub fn render(&self, order: &OrderCreatedPayload) -> String {
        self.render_at(order, shared::util::now_millis())
    }

    /// Render a kitchen ticket stamped with `printed_at` (Unix millis)
    pub fn render_at(&self, order: &OrderCreatedPayload, printed_at: i64) -> String {
        let mut b = TicketBuilder::new(self.width);

        b.eq_sep();
        b.text_center("KITCHEN ORDER");
        b.eq_sep();
        b.write_line(&format!("Order #: {}", order.order_number));
        b.write_line(&format!("Type:    {}", order.order_type));
        if let Some(name) = order.customer_name.as_deref().filter(|n| !n.is_empty()) {
            b.write_line(&format!("Name:    {}", name));
        }
        b.write_line(&format!(
            "Time:    {}",
            format_millis(printed_at, self.timezone, "%H:%M:%S")
        ));
        b.dash_sep();

        for item in &order.items {
            b.write_line(&format!("  {}x  {}", item.quantity, item.item_name));
            if let Some(note) = item.special_instructions.as_deref().filter(|n| !n.is_empty()) {
                b.write_line(&format!("       ** {}", note));
            }
        }

        b.eq_sep();
        b.finalize()
    }
}

impl Default for KitchenTicketRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, Tz::UTC)
    }
}

/// 小票抬头
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl Default for CompanyInfo {
    fn default() -> Self {
        Self {
            name: "Your Restaurant Name".to_string(),
            address: "123 Main Street, City, State 12345".to_string(),
            phone: "(555) 123-4567".to_string(),
        }
    }
}

/// Name column width on receipt item lines
const NAME_COL: usize = 25;

/// Customer receipt renderer
pub struct ReceiptRenderer {
    width: usize,
    timezone: Tz,
    company: CompanyInfo,
}

impl ReceiptRenderer {
    pub fn new(width: usize, timezone: Tz, company: CompanyInfo) -> Self {
        Self {
            width,
            timezone,
            company,
        }
    }

    pub fn company(&self) -> &CompanyInfo {
        &self.company
    }

    pub fn render(&self, order: &Order, items: &[OrderItem]) -> String {
        let mut b = TicketBuilder::new(self.width);

        // Header
        for line in [&self.company.name, &self.company.address, &self.company.phone] {
            if !line.is_empty() {
                b.text_center(line);
            }
        }
        b.eq_sep();
        b.text_center("RECEIPT");
        b.eq_sep();
        b.write_line("");

        // Order info
        b.write_line(&format!("Order #: {}", order.order_number));
        b.write_line(&format!(
            "Date: {}",
            format_millis(order.created_at, self.timezone, "%Y-%m-%d %H:%M:%S")
        ));
        b.write_line(&format!(
            "Customer: {}",
            order
                .customer_name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or("Walk-in")
        ));
        b.write_line(&format!("Type: {}", order_type_label(order.order_type)));
        b.write_line(&format!("Payment: {}", order.payment_method.as_str()));
        b.dash_sep();

        // Items
        for item in items {
            let name = if text_width(&item.item_name) > NAME_COL {
                format!("{}...", truncate_text(&item.item_name, NAME_COL - 3))
            } else {
                item.item_name.clone()
            };
            b.line_lr(
                &format!("{} {:>3}", pad_text(&name, NAME_COL, false), item.quantity),
                &format!("${:.2}", item.total_price),
            );
            if let Some(note) = item.special_instructions.as_deref().filter(|n| !n.is_empty()) {
                b.write_line(&format!("  Note: {}", note));
            }
        }
        b.dash_sep();

        // Totals
        b.pair("Subtotal:", &format!("${:.2}", order.subtotal));
        b.pair("Tax:", &format!("${:.2}", order.tax_amount));
        b.eq_sep();
        b.pair("TOTAL:", &format!("${:.2}", order.total_amount));
        b.eq_sep();
        b.write_line("");
        b.text_center("Thank you for your business!");

        b.finalize()
    }
}

impl Default for ReceiptRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, Tz::UTC, CompanyInfo::default())
    }
}

/// `dine_in` → `Dine In`
fn order_type_label(order_type: OrderType) -> String {
    order_type
        .as_str()
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
