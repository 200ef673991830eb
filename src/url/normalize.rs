use crate::{UrlError, UrlResult};
use url::Url;

/// Query parameters that only carry referral or tracking data
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "mc_eid", "ref", "source", "from", "utm",
];

/// Normalizes a post link so the same post always yields the same string
///
/// # Normalization Steps
///
/// 1. Resolve `href` against `base` (feeds often emit relative links)
/// 2. Reject anything that is not HTTP(S) or has no host
/// 3. Normalize the path: drop dot segments, empty segments and any trailing slash
/// 4. Remove the fragment
/// 5. Remove tracking query parameters, sort the rest, drop an empty query
///
/// The scheme and host are kept as-is (apart from the lowercasing `Url`
/// already performs) so the normalized link stays navigable.
///
/// # Examples
///
/// ```
/// use board_harvest::url::normalize_post_link;
/// use url::Url;
///
/// let base = Url::parse("https://forum.example.com/f/travel").unwrap();
/// let link = normalize_post_link("/f/travel/p/42/?utm_source=feed#c3", &base).unwrap();
/// assert_eq!(link.as_str(), "https://forum.example.com/f/travel/p/42");
/// ```
pub fn normalize_post_link(href: &str, base: &Url) -> UrlResult<Url> {
    let href = href.trim();
    if href.is_empty() {
        return Err(UrlError::Parse("empty href".to_string()));
    }

    let mut url = base
        .join(href)
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query_string = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query_string));
        }
    }

    Ok(url)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://forum.example.com/f/travel?latest=true").unwrap()
    }

    #[test]
    fn test_resolves_relative_link() {
        let result = normalize_post_link("/f/travel/p/123", &base()).unwrap();
        assert_eq!(result.as_str(), "https://forum.example.com/f/travel/p/123");
    }

    #[test]
    fn test_keeps_absolute_link() {
        let result = normalize_post_link("https://other.example.com/p/9", &base()).unwrap();
        assert_eq!(result.as_str(), "https://other.example.com/p/9");
    }

    #[test]
    fn test_lowercases_host() {
        let result = normalize_post_link("https://FORUM.Example.COM/p/1", &base()).unwrap();
        assert_eq!(result.as_str(), "https://forum.example.com/p/1");
    }

    #[test]
    fn test_remove_trailing_slash_and_fragment() {
        let result = normalize_post_link("/p/5/#comment-3", &base()).unwrap();
        assert_eq!(result.as_str(), "https://forum.example.com/p/5");
    }

    #[test]
    fn test_remove_dot_segments() {
        let result = normalize_post_link("/f/./travel/../food/p/7", &base()).unwrap();
        assert_eq!(result.as_str(), "https://forum.example.com/f/food/p/7");
    }

    #[test]
    fn test_strip_tracking_params() {
        let result =
            normalize_post_link("/p/5?utm_source=x&ref=feed&fbclid=abc", &base()).unwrap();
        assert_eq!(result.as_str(), "https://forum.example.com/p/5");
    }

    #[test]
    fn test_keeps_and_sorts_meaningful_params() {
        let result = normalize_post_link("/p/5?page=2&lang=zh&utm_medium=y", &base()).unwrap();
        assert_eq!(result.as_str(), "https://forum.example.com/p/5?lang=zh&page=2");
    }

    #[test]
    fn test_rejects_special_schemes() {
        assert!(matches!(
            normalize_post_link("javascript:void(0)", &base()),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(normalize_post_link("mailto:someone@example.com", &base()).is_err());
    }

    #[test]
    fn test_rejects_empty_href() {
        assert!(normalize_post_link("   ", &base()).is_err());
    }

    #[test]
    fn test_same_post_same_link() {
        let a = normalize_post_link("https://forum.example.com/p/77/", &base()).unwrap();
        let b = normalize_post_link("/p/77?utm_campaign=z#top", &base()).unwrap();
        assert_eq!(a, b);
    }
}
