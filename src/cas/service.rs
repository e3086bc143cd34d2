//! Service URL resolution.

use anyhow::{Context, Result};
use url::Url;

/// Query parameter carrying the CAS service ticket.
pub const TICKET_PARAM: &str = "ticket";

/// Resolve the CAS service URL for a request.
///
/// The request's original URL is joined onto the server's public URL and
/// every `ticket` query pair is removed. The remaining query is re-encoded, so
/// resolving an already resolved URL returns it unchanged. The CAS server
/// compares this value between login and validation, so it must be stable.
pub fn resolve_service_url(server_url: &Url, original_url: &str) -> Result<String> {
    let mut url = server_url
        .join(original_url)
        .with_context(|| format!("Invalid request URL: {}", original_url))?;

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != TICKET_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if retained.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(retained);
    }

    Ok(url.to_string())
}
