use url::Url;

const DEFAULT_WEB_PORTS: [u16; 2] = [80, 443];

/// A website reduced to the forms the pipeline compares and stores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalWebsite {
    /// Absolute https URL without query, fragment or trailing slash
    pub url: String,
    /// Scheme-less host and path with any `www.` prefix removed
    pub identity_key: String,
}

/// Canonicalize a website value.
///
/// A missing scheme is read as https and http is upgraded. Host and path are
/// lower-cased; default ports, credentials, query, fragment and trailing
/// slash are dropped. `www.` is removed from every identity key, so the
/// stripping is applied to both sides of any comparison alike.
pub fn canonicalize_website(raw: &str) -> Result<CanonicalWebsite, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("website is blank".to_string());
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(format!("website '{}' contains whitespace", trimmed));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&candidate).map_err(|e| format!("website '{}': {}", trimmed, e))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!(
            "website '{}' uses unsupported scheme '{}'",
            trimmed,
            parsed.scheme()
        ));
    }

    // IP literals and single-label hosts never identify a business site
    let host = parsed
        .domain()
        .ok_or_else(|| format!("website '{}' has no domain name", trimmed))?
        .trim_end_matches('.')
        .to_lowercase();
    if !host.contains('.') || host.starts_with('.') || host.split('.').any(str::is_empty) {
        return Err(format!("website '{}' has an incomplete domain '{}'", trimmed, host));
    }

    // http is upgraded, so either web default port names the same site
    let port = parsed
        .port()
        .filter(|port| !DEFAULT_WEB_PORTS.contains(port))
        .map(|port| format!(":{}", port))
        .unwrap_or_default();
    let path = parsed.path().trim_end_matches('/').to_lowercase();

    let identity_host = host.strip_prefix("www.").unwrap_or(&host);

    Ok(CanonicalWebsite {
        url: format!("https://{}{}{}", host, port, path),
        identity_key: format!("{}{}{}", identity_host, port, path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_case_and_trailing_slash() {
        let site = canonicalize_website("HTTP://JaneDev.IO/").unwrap();
        assert_eq!(site.url, "https://janedev.io");
        assert_eq!(site.identity_key, "janedev.io");
    }

    #[test]
    fn test_bare_domain_matches_full_url() {
        let bare = canonicalize_website("acme.com").unwrap();
        let full = canonicalize_website("https://acme.com/").unwrap();
        assert_eq!(bare, full);
    }

    #[test]
    fn test_www_query_fragment_and_default_port_are_dropped() {
        let site = canonicalize_website("https://www.Acme.com:443/About/?utm_source=x#team").unwrap();
        assert_eq!(site.url, "https://www.acme.com/about");
        assert_eq!(site.identity_key, "acme.com/about");

        let plain = canonicalize_website("http://acme.com:80").unwrap();
        assert_eq!(plain.identity_key, "acme.com");

        let upgraded = canonicalize_website("http://acme.com:443").unwrap();
        assert_eq!(upgraded.url, "https://acme.com");
        assert_eq!(upgraded.identity_key, "acme.com");

        let crossed = canonicalize_website("https://acme.com:80").unwrap();
        assert_eq!(crossed, canonicalize_website("acme.com").unwrap());
    }

    #[test]
    fn test_non_default_port_is_kept() {
        let site = canonicalize_website("acme.com:8080/shop").unwrap();
        assert_eq!(site.identity_key, "acme.com:8080/shop");
    }

    #[test]
    fn test_invalid_websites() {
        assert!(canonicalize_website("not a url").is_err());
        assert!(canonicalize_website("").is_err());
        assert!(canonicalize_website("localhost").is_err());
        assert!(canonicalize_website("ftp://acme.com").is_err());
        assert!(canonicalize_website("http://192.168.0.1").is_err());
        assert!(canonicalize_website("https://").is_err());
    }
}
