//! Built-in dictionary formats.

mod cedict;
mod dictcc;
mod espdic;

pub use cedict::{render_pinyin, CedictReader};
pub use dictcc::DictccReader;
pub use espdic::EspdicReader;

/// Strip a trailing carriage return and a leading byte order mark.
pub(crate) fn clean_line(line: &str) -> &str {
    let line = line.strip_suffix('\r').unwrap_or(line);
    line.strip_prefix('\u{feff}').unwrap_or(line)
}
