//! # pos-printer
//!
//! Output library for POS printers - low-level capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW a ticket reaches its output:
//! - Plain-text ticket layout (fixed-width columns, separators, centering)
//! - File-based artifact output (one timestamped file per print job)
//!
//! Business logic (WHAT to print) stays in application code:
//! - Kitchen ticket / receipt rendering → pos-edge
//!
//! ## Example
//!
//! ```no_run
//! use pos_printer::{FileOutput, TicketBuilder};
//!
//! let mut b = TicketBuilder::new(40);
//! b.eq_sep();
//! b.text_center("KITCHEN ORDER");
//! b.eq_sep();
//! b.pair("Order #:", "ORD1700000000000");
//!
//! let output = FileOutput::new("receipts", "kitchen");
//! output.ensure_dir()?;
//! let path = output.write(&b.finalize())?;
//! println!("saved to {}", path.display());
//! # Ok::<(), pos_printer::PrintError>(())
//! ```

mod error;
mod output;
mod text;

// Re-exports
pub use error::{PrintError, PrintResult};
pub use output::FileOutput;
pub use text::{TicketBuilder, pad_text, text_width, truncate_text};
