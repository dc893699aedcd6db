//! CLI command implementations for the `trailmap` binary.

pub mod export_cmd;
pub mod output;

use url::Url;

/// Parse the positional trail URL. Only absolute http(s) URLs are accepted.
pub fn parse_trail_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| format!("invalid URL '{raw}': {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported URL scheme '{other}', expected http or https")),
    }
}
