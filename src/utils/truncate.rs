//! Truncation Utilities
//!
//! Shortens server messages and receipt hashes for logs and the console
//! without splitting a UTF-8 character.

/// Keep at most `max_bytes` of `content`, cut on a char boundary, with an
/// ellipsis marking the cut.
pub fn truncate_text(content: &str, max_bytes: usize) -> String {
    if content.len() <= max_bytes {
        return content.to_string();
    }

    let mut end = 0;
    for (idx, c) in content.char_indices() {
        let char_end = idx + c.len_utf8();
        if char_end > max_bytes {
            break;
        }
        end = char_end;
    }

    format!("{}...", &content[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(truncate_text("0xabc", 20), "0xabc");
    }

    #[test]
    fn test_cuts_on_char_boundary() {
        // "₹" is three bytes; a four-byte budget must not split the second one.
        assert_eq!(truncate_text("₹₹₹", 4), "₹...");
        assert_eq!(truncate_text("0x1234567890", 4), "0x12...");
        assert_eq!(truncate_text("abc", 0), "...");
    }
}
