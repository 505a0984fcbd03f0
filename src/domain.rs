//! Registrable-domain extraction: the eTLD+1 that keys every politeness and
//! queuing decision.

use std::net::IpAddr;
use url::Url;

/// Extract the registrable domain (eTLD+1) from a normalized URL.
///
/// IP-literal hosts are returned as-is (lowercased). Hosts without a public
/// suffix match fall back to the full lowercased host, matching the public
/// suffix list's own behavior for unlisted TLDs.
pub fn extract_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(registrable_domain(host))
}

/// Same as [`extract_domain`] but takes a bare host string directly.
pub fn registrable_domain(host: &str) -> String {
    let host = host.to_lowercase();

    if host.parse::<IpAddr>().is_ok() {
        return host;
    }

    match psl::domain_str(&host) {
        Some(registrable) => registrable.to_lowercase(),
        None => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_etld_plus_one() {
        assert_eq!(
            extract_domain("https://www.example.com/a/b").unwrap(),
            "example.com"
        );
    }

    #[test]
    fn extracts_multi_label_public_suffix() {
        assert_eq!(
            extract_domain("https://deep.sub.example.co.uk/x").unwrap(),
            "example.co.uk"
        );
    }

    #[test]
    fn lowercases_result() {
        assert_eq!(
            extract_domain("https://WWW.Example.COM/x").unwrap(),
            "example.com"
        );
    }

    #[test]
    fn ip_literal_host_returns_literal() {
        assert_eq!(
            extract_domain("http://192.168.1.1/x").unwrap(),
            "192.168.1.1"
        );
    }

    #[test]
    fn two_urls_same_domain_share_fate() {
        let a = extract_domain("https://a.example.com/1").unwrap();
        let b = extract_domain("https://b.example.com/2").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unparseable_url_returns_none() {
        assert!(extract_domain("not a url").is_none());
    }
}
