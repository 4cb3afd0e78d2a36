//! Response classification (§4.1 ban classification, decided here and acted
//! on by the proxy pool).

use crate::model::Classification;

/// Body substrings recognized as an unsolved CloudFlare challenge. Kept as a
/// small, explicit list rather than a full challenge-page parser: the
/// bypass service is expected to clear these on its own, so seeing one here
/// means the bypass failed or is disabled.
const CLOUDFLARE_MARKERS: [&str; 3] = [
    "cf-browser-verification",
    "Checking your browser before accessing",
    "Attention Required! | Cloudflare",
];

/// Path fragments that, combined with a 2xx/3xx response and a session
/// cookie already present, indicate the site bounced the request back to a
/// login or age-verification gate instead of honoring the session.
const GATE_PATH_MARKERS: [&str; 2] = ["/login", "/age-gate"];

/// Classify a completed HTTP response.
///
/// `has_session_cookie` reflects whether the request carried a previously
/// established session cookie; `bypass_exhausted` is true once the
/// challenge-bypass layer has already been given a chance to clear a
/// CloudFlare page and failed.
#[must_use]
pub fn classify_response(
    status: u16,
    final_url: &str,
    body: &[u8],
    has_session_cookie: bool,
    bypass_exhausted: bool,
) -> Classification {
    if status == 403 {
        return Classification::Ban;
    }
    if status == 401 {
        return Classification::Auth;
    }
    if status == 429 || (500..=599).contains(&status) {
        return Classification::Transient;
    }
    if has_session_cookie && GATE_PATH_MARKERS.iter().any(|marker| final_url.contains(marker)) {
        return Classification::Ban;
    }
    if bypass_exhausted && body_shows_cloudflare_challenge(body) {
        return Classification::Ban;
    }
    Classification::Ok
}

fn body_shows_cloudflare_challenge(body: &[u8]) -> bool {
    let text = String::from_utf8_lossy(body);
    CLOUDFLARE_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Classify a transport-level failure (connect error, DNS failure, timeout)
/// that never produced an HTTP response.
#[must_use]
pub const fn classify_transport_error() -> Classification {
    Classification::Network
}
