use unicode_width::UnicodeWidthStr;

/// Display width in terminal columns. Wide characters count as two.
pub fn text_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Pad `text` with spaces to `width` display columns.
pub fn pad_to(text: &str, width: usize) -> String {
    let mut out = text.to_string();
    for _ in text_width(text)..width {
        out.push(' ');
    }
    out
}
