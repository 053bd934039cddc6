//! Small helpers shared across modules

/// Longest prefix of `s` that fits in `max_bytes` without splitting a
/// character. Keeps remote error bodies bounded in log fields.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
