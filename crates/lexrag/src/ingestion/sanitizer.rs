//! Removal of characters that break storage and embedding

/// Strip null bytes, C0/C1 control characters (tab, newline and carriage
/// return are kept) and U+FFFD, then trim surrounding whitespace.
///
/// Total and idempotent.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !is_stripped(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

fn is_stripped(c: char) -> bool {
    match c {
        '\t' | '\n' | '\r' => false,
        '\u{FFFD}' => true,
        c => c.is_control(),
    }
}
