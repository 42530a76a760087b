//! Image URL format rewriting.
//!
//! The source CDN picks the delivery format from the query string, so asking
//! for JPEG is a matter of rewriting a handful of known markers. The rewrite
//! is best effort: nothing guarantees the origin honors it.

/// Literal `(pattern, replacement)` pairs, applied in order.
const FORMAT_REWRITES: &[(&str, &str)] = &[
    ("/640?from=appmsg", "/640?from=appmsg&tp=jpg"),
    ("&tp=webp", "&tp=jpg"),
    ("wx_fmt=webp", "wx_fmt=jpg"),
];

/// Rewrites an image URL so the origin serves JPEG.
///
/// Each substitution only fires when its pattern is present; URLs without any
/// of the markers come back unchanged. Applying the function twice gives the
/// same result as applying it once.
///
/// # Example
///
/// ```rust
/// use pluck_core::normalize_image_url;
///
/// assert_eq!(
///     normalize_image_url("https://img/a?wx_fmt=webp"),
///     "https://img/a?wx_fmt=jpg"
/// );
/// ```
pub fn normalize_image_url(url: &str) -> String {
    let mut out = url.to_string();

    for (pattern, replacement) in FORMAT_REWRITES {
        if !out.contains(pattern) {
            continue;
        }
        // the first marker is a prefix of its own replacement
        if replacement.starts_with(pattern) {
            out = replace_unless_followed(&out, pattern, &replacement[pattern.len()..]);
        } else {
            out = out.replace(pattern, replacement);
        }
    }

    out
}

/// Appends `suffix` after every `pattern` occurrence not already followed by it.
fn replace_unless_followed(input: &str, pattern: &str, suffix: &str) -> String {
    let mut out = String::with_capacity(input.len() + suffix.len());
    let mut rest = input;

    while let Some(pos) = rest.find(pattern) {
        let end = pos + pattern.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];
        if !rest.starts_with(suffix) {
            out.push_str(suffix);
        }
    }
    out.push_str(rest);

    out
}
