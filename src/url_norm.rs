//! URL normalization.
//!
//! Normalization is applied uniformly at every add-path boundary: lowercase
//! scheme/host, drop default ports, drop the fragment, resolve `.`/`..`
//! segments, collapse duplicate slashes, and strip a trailing slash from any
//! non-root path. Failures never panic — callers get `Err` and drop the URL.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("input is empty after trimming")]
    Empty,
    #[error("input is not a parseable URL")]
    Unparseable,
    #[error("scheme is not http or https")]
    UnsupportedScheme,
    #[error("URL has no host")]
    MissingHost,
    #[error("path is empty after normalization")]
    EmptyPath,
}

/// Normalize a raw URL string. Never panics.
pub fn normalize(raw: &str) -> Result<String, NormalizeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NormalizeError::Empty);
    }

    let mut parsed = Url::parse(trimmed).map_err(|_| NormalizeError::Unparseable)?;

    match parsed.scheme() {
        "http" | "https" => {}
        _ => return Err(NormalizeError::UnsupportedScheme),
    }

    if parsed.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(NormalizeError::MissingHost);
    }

    // `url` already lowercases scheme and (non-opaque) host during parsing.
    if let Some(port) = parsed.port() {
        let default_port = match parsed.scheme() {
            "http" => Some(80),
            "https" => Some(443),
            _ => None,
        };
        if Some(port) == default_port {
            let _ = parsed.set_port(None);
        }
    }

    parsed.set_fragment(None);

    // `url` resolves `.`/`..` segments per the WHATWG URL Standard during
    // parsing, but does not collapse runs of plain slashes, so do that here.
    let collapsed = collapse_slashes(parsed.path());
    let normalized_path = strip_trailing_slash(&collapsed);
    if normalized_path.is_empty() {
        return Err(NormalizeError::EmptyPath);
    }
    parsed.set_path(&normalized_path);

    Ok(parsed.to_string())
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }
    out
}

fn strip_trailing_slash(path: &str) -> String {
    if path.len() > 1 && path.ends_with('/') {
        path[..path.len() - 1].to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_scheme_and_host() {
        assert_eq!(
            normalize("HTTP://Example.COM/Path").unwrap(),
            "http://example.com/Path"
        );
    }

    #[test]
    fn drops_default_ports() {
        assert_eq!(
            normalize("http://example.com:80/x").unwrap(),
            "http://example.com/x"
        );
        assert_eq!(
            normalize("https://example.com:443/x").unwrap(),
            "https://example.com/x"
        );
        assert_eq!(
            normalize("http://example.com:8080/x").unwrap(),
            "http://example.com:8080/x"
        );
    }

    #[test]
    fn drops_fragment() {
        assert_eq!(
            normalize("http://a.com/x#section").unwrap(),
            "http://a.com/x"
        );
    }

    #[test]
    fn strips_trailing_slash_except_root() {
        assert_eq!(normalize("http://a.com/x/").unwrap(), "http://a.com/x");
        assert_eq!(normalize("http://a.com/").unwrap(), "http://a.com/");
        assert_eq!(normalize("http://a.com").unwrap(), "http://a.com/");
    }

    #[test]
    fn collapses_duplicate_slashes() {
        assert_eq!(
            normalize("http://a.com//foo//bar").unwrap(),
            "http://a.com/foo/bar"
        );
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert_eq!(
            normalize("ftp://a.com/x"),
            Err(NormalizeError::UnsupportedScheme)
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(normalize("   "), Err(NormalizeError::Empty));
    }

    #[test]
    fn rejects_unparseable_input() {
        assert_eq!(normalize("not a url at all"), Err(NormalizeError::Unparseable));
    }

    #[test]
    fn rejects_malformed_ipv6_bracket_host() {
        assert_eq!(
            normalize("http://[::1 not-valid]/x"),
            Err(NormalizeError::Unparseable)
        );
    }

    #[test]
    fn idempotent() {
        let cases = [
            "HTTP://Example.COM:80/a//b/?q=1#frag",
            "https://a.com/x/",
            "https://a.com/",
        ];
        for c in cases {
            let once = normalize(c).unwrap();
            let twice = normalize(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn preserves_query_strings() {
        assert_eq!(
            normalize("http://a.com/search?q=rust").unwrap(),
            "http://a.com/search?q=rust"
        );
    }
}
