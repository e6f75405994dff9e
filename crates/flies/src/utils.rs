//! Small helpers shared across the crate.

/// Returns early with an error if a condition is not met.
///
/// Works like `assert!`, except that it returns `Err($error)` instead of panicking.
///
/// ```ignore
/// ensure!(headers.len() < MAX_HEADERS, ParseError::too_many_headers(MAX_HEADERS));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

/// Renders at most `limit` bytes of `bytes` as lossy UTF-8, for diagnostics.
pub(crate) fn preview(bytes: &[u8], limit: usize) -> String {
    let end = bytes.len().min(limit);
    let mut text = String::from_utf8_lossy(&bytes[..end]).into_owned();
    if bytes.len() > limit {
        text.push_str(" ...");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn preview_truncates_long_input() {
        assert_eq!(preview(b"GET / HTTP/1.1", 3), "GET ...");
        assert_eq!(preview(b"GET", 3), "GET");
        assert_eq!(preview(b"", 3), "");
    }
}
