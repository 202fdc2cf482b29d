//! Plain-text ticket builder
//!
//! Provides a fluent API for laying out fixed-width ticket text.

/// Column width of a single char
///
/// 热敏打印机按 GBK 字节计宽：ASCII 占 1 列，中文占 2 列。
/// GBK 无法编码的字符按 2 列计。
fn char_width(c: char) -> usize {
    if c.is_ascii() {
        return 1;
    }
    let mut buf = [0u8; 4];
    let (encoded, _, had_errors) = encoding_rs::GBK.encode(c.encode_utf8(&mut buf));
    if had_errors { 2 } else { encoded.len() }
}

/// Display width of a string in printer columns
pub fn text_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Truncate a string to fit within `max_width` columns
pub fn truncate_text(s: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut result = String::new();
    for c in s.chars() {
        let w = char_width(c);
        if width + w > max_width {
            break;
        }
        result.push(c);
        width += w;
    }
    result
}

/// Pad a string to a specific width
///
/// If the string is longer than the width, it will be truncated.
pub fn pad_text(s: &str, width: usize, align_right: bool) -> String {
    let current_width = text_width(s);
    if current_width >= width {
        return truncate_text(s, width);
    }
    let spaces = width - current_width;
    if align_right {
        format!("{}{}", " ".repeat(spaces), s)
    } else {
        format!("{}{}", s, " ".repeat(spaces))
    }
}

/// String-based ticket builder
///
/// Accumulates plain UTF-8 text laid out for a fixed paper width.
pub struct TicketBuilder {
    buf: String,
    width: usize,
}

impl TicketBuilder {
    /// Create a new text builder with specified paper width in characters
    pub fn new(width: usize) -> Self {
        Self {
            buf: String::new(),
            width,
        }
    }

    /// Get the configured paper width
    pub fn width(&self) -> usize {
        self.width
    }

    // === Text Output ===

    /// Write raw text
    pub fn write(&mut self, s: &str) -> &mut Self {
        self.buf.push_str(s);
        self
    }

    /// Write text followed by newline
    pub fn write_line(&mut self, s: &str) -> &mut Self {
        self.buf.push_str(s);
        self.buf.push('\n');
        self
    }

    // === Separators ===

    /// Print a line of '=' characters
    pub fn eq_sep(&mut self) -> &mut Self {
        self.write_line(&"=".repeat(self.width))
    }

    /// Print a line of '-' characters
    pub fn dash_sep(&mut self) -> &mut Self {
        self.write_line(&"-".repeat(self.width))
    }

    // === Layout Helpers ===

    /// Print text centered in the current line width
    pub fn text_center(&mut self, s: &str) -> &mut Self {
        let w = text_width(s);
        if w >= self.width {
            return self.write_line(s);
        }
        let left = (self.width - w) / 2;
        self.write(&" ".repeat(left));
        self.write_line(s)
    }

    /// Print left and right text on the same line
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = text_width(left);
        let rw = text_width(right);

        if lw + rw >= self.width {
            self.write_line(&format!("{} {}", left, right));
        } else {
            let spaces = self.width - lw - rw;
            self.write(left);
            self.write(&" ".repeat(spaces));
            self.write_line(right);
        }
        self
    }

    /// Print a key-value pair (alias for line_lr)
    pub fn pair(&mut self, key: &str, value: &str) -> &mut Self {
        self.line_lr(key, value)
    }

    // === Build ===

    /// Finalize and return the accumulated string
    ///
    /// The trailing newline of the last line is dropped.
    pub fn finalize(mut self) -> String {
        if self.buf.ends_with('\n') {
            self.buf.pop();
        }
        self.buf
    }

    /// Get the current buffer as a string reference
    pub fn as_str(&self) -> &str {
        &self.buf
    }
}

impl Default for TicketBuilder {
    fn default() -> Self {
        Self::new(40)
    }
}
