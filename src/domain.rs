/// Domain extraction for history records
use url::Url;

/// Returned for anything that is not an absolute URL with a host.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Extract the normalized domain of a URL.
///
/// The hostname is taken as parsed (the URL parser lowercases hosts of the
/// special schemes) and a single leading `www.` is stripped. History entries
/// are never dropped because of their URL, so anything unparsable maps to
/// [`UNKNOWN_DOMAIN`] instead of an error.
///
/// Examples:
/// - https://www.youtube.com/watch?v=abc → youtube.com
/// - https://music.youtube.com/watch → music.youtube.com
/// - https://www.www.example.com → www.example.com
/// - not a url → unknown
pub fn extract_domain(url: &str) -> String {
    Url::parse(url.trim())
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .filter(|host| !host.is_empty())
        .map(|host| match host.strip_prefix("www.") {
            Some(rest) if !rest.is_empty() => rest.to_string(),
            _ => host,
        })
        .unwrap_or_else(|| UNKNOWN_DOMAIN.to_string())
}
