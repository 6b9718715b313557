use axum::http::Request;
use tracing::Span;

use crate::middleware::tracing::REQUEST_ID_HEADER;

/// Span factory for `TraceLayer::make_span_with`.
///
/// The `subject` field is left empty here and recorded later by the
/// authentication gate once the caller is known.
pub fn http_request_span<B>(request: &Request<B>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
        version = ?request.version(),
        subject = tracing::field::Empty,
    )
}
