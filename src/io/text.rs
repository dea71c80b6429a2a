//! Line-oriented helpers for text formats read from a [`ByteSource`].

use super::ByteSource;

const WHITESPACE: &[char] = &['\t', '\r', '\n', '\x0b', ' '];

/// Strip tabs, carriage returns, newlines, vertical tabs and spaces from
/// both ends.
pub fn trim(text: &str) -> &str {
    text.trim_matches(WHITESPACE)
}

/// Read bytes up to the next `\n` into `line`, consuming the newline.
///
/// A `\r` before the newline is kept. Returns `false` if the source latched
/// an error before a newline was found; whatever was read is still left in
/// `line`.
pub fn read_line<S: ByteSource + ?Sized>(source: &mut S, line: &mut String) -> bool {
    let mut bytes = Vec::new();
    loop {
        source.ensure_bytes_available();
        if source.error().is_some() {
            break;
        }

        let window = source.peek();
        match window.iter().position(|&b| b == b'\n') {
            Some(newline) => {
                bytes.extend_from_slice(&window[..newline]);
                source.consume(newline + 1);
                break;
            }
            None => {
                bytes.extend_from_slice(window);
                let len = window.len();
                source.consume(len);
            }
        }
    }

    line.clear();
    line.push_str(&String::from_utf8_lossy(&bytes));
    source.error().is_none()
}
