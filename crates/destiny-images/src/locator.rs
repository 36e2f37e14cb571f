//! Public URL path parsing.

use destiny_core::is_day_string;

/// A stored image addressed as `<bucket>/<file>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Locator {
    pub bucket: String,
    pub file: String,
}

impl Locator {
    /// Extension of the file name, if any.
    pub fn extension(&self) -> Option<&str> {
        self.file.rsplit_once('.').map(|(_, ext)| ext)
    }
}

/// Why a URL path was not accepted as a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejection {
    Prefix,
    Character,
    Escape,
    Shape,
}

/// Parse `<prefix>/<bucket>/<file>` into a locator.
///
/// `.` and `..` are resolved lexically. Paths that climb above the prefix,
/// contain a backslash or NUL, do not resolve to exactly two segments, or
/// whose bucket is not a `YYYY-MM-DD` day are rejected.
pub(crate) fn parse_locator(prefix: &str, url_path: &str) -> Result<Locator, Rejection> {
    let prefix = prefix.trim_end_matches('/');
    let rest = url_path
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or(Rejection::Prefix)?;

    if rest.contains(['\\', '\0']) {
        return Err(Rejection::Character);
    }

    let mut segments: Vec<&str> = Vec::with_capacity(2);
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop().ok_or(Rejection::Escape)?;
            }
            other => segments.push(other),
        }
    }

    match segments.as_slice() {
        [bucket, file] if is_day_string(bucket) => Ok(Locator {
            bucket: (*bucket).to_string(),
            file: (*file).to_string(),
        }),
        _ => Err(Rejection::Shape),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(url: &str) -> Result<Locator, Rejection> {
        parse_locator("/images", url)
    }

    #[test]
    fn test_valid_locator() {
        let loc = parse("/images/2024-01-01/abc.jpg").unwrap();
        assert_eq!(loc.bucket, "2024-01-01");
        assert_eq!(loc.file, "abc.jpg");
        assert_eq!(loc.extension(), Some("jpg"));
    }

    #[test]
    fn test_lexical_normalization() {
        let loc = parse("/images/2024-01-01/../2024-01-02/./x.png").unwrap();
        assert_eq!(loc.bucket, "2024-01-02");
        assert_eq!(loc.file, "x.png");
        assert!(parse("/images//2024-01-01//x.png").is_ok());
    }

    #[test]
    fn test_rejections() {
        assert_eq!(parse("/images/../../etc/passwd"), Err(Rejection::Escape));
        assert_eq!(parse("/images/2024-01-01/../../x"), Err(Rejection::Escape));
        assert_eq!(parse("/static/2024-01-01/x.jpg"), Err(Rejection::Prefix));
        assert_eq!(parse("/imagesX/2024-01-01/x.jpg"), Err(Rejection::Prefix));
        assert_eq!(parse("/images/2024-01-01\\x.jpg"), Err(Rejection::Character));
        assert_eq!(parse("/images/2024-01-01/x\0.jpg"), Err(Rejection::Character));
        assert_eq!(parse("/images/2024-01-01"), Err(Rejection::Shape));
        assert_eq!(parse("/images/2024-01-01/a/b.jpg"), Err(Rejection::Shape));
        assert_eq!(parse("/images/tmp/x.jpg"), Err(Rejection::Shape));
        assert_eq!(parse("/images/2024-01-01/.."), Err(Rejection::Shape));
    }

    #[test]
    fn test_prefix_trailing_slash() {
        assert!(parse_locator("/images/", "/images/2024-01-01/a.gif").is_ok());
        assert!(parse_locator("/media", "/media/2024-01-01/a.gif").is_ok());
    }
}
