//! User id sanitizing.
//!
//! User ids arrive from untrusted headers and request bodies and become
//! storage keys (file names for [`FileUsageStore`](crate::FileUsageStore)),
//! so everything outside `[A-Za-z0-9-]` is stripped.

/// Strip every character except ASCII alphanumerics and `-`.
///
/// Returns `None` when nothing is left.
///
/// # Example
/// ```
/// use destiny_usage::sanitize_user_id;
///
/// assert_eq!(sanitize_user_id("user-42").as_deref(), Some("user-42"));
/// assert_eq!(sanitize_user_id("../../etc/passwd").as_deref(), Some("etcpasswd"));
/// assert_eq!(sanitize_user_id("../"), None);
/// ```
pub fn sanitize_user_id(raw: &str) -> Option<String> {
    let clean: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if clean.is_empty() { None } else { Some(clean) }
}

/// Whether `key` is already a sanitized, non-empty user id.
#[inline]
pub fn is_safe_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}
