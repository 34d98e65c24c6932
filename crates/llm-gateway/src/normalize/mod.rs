//! Request target repair
//!
//! Some clients build completion URLs by appending path segments after a URL
//! that already carried a query string, producing targets such as
//! `/models/openai/gpt-4?session=abc/chat/completions`. The normalizer moves
//! the embedded query to the end of the path and merges it with any query that
//! was already trailing:
//!
//! ```text
//! /models/openai/gpt-4?session=abc&id=test/chat/completions/stream?format=json
//!   -> /models/openai/gpt-4/chat/completions/stream?session=abc&id=test&format=json
//! ```
//!
//! Repair is best effort. A target it cannot repair unambiguously passes
//! through unchanged; the normalizer never rejects a request.

mod query;

use axum::extract::Request;
use axum::http::Uri;

pub use query::QueryParams;

/// Repaired path and merged query of a request target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTarget {
    pub path: String,
    pub query: QueryParams,
}

impl NormalizedTarget {
    /// Path followed by the encoded query, if any
    #[must_use]
    pub fn to_target(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query.encode())
        }
    }
}

/// Repair a request target (path plus optional `?query`).
///
/// Returns `None` when the target has no embedded query or cannot be
/// repaired; callers then leave the request untouched.
#[must_use]
pub fn normalize_target(target: &str) -> Option<NormalizedTarget> {
    let (path, trailing) = split_trailing_query(target);

    let segments: Vec<&str> = path.split('/').collect();
    let index = segments.iter().position(|segment| segment.contains('?'))?;
    let (base, embedded) = segments[index].split_once('?')?;

    // `/?next=/home` is a root request whose query contains a slash.
    if base.is_empty() {
        return None;
    }

    // Nothing to relocate, e.g. an encoded `?` inside a file name.
    if embedded.is_empty() {
        return None;
    }

    // `?callback=https://host/path` is a URL value, not relocated segments.
    let rest = &segments[index + 1..];
    if embedded.ends_with(':') || rest.iter().any(|segment| segment.is_empty()) {
        return None;
    }

    let mut repaired: Vec<String> = Vec::with_capacity(segments.len());
    repaired.extend(segments[..index].iter().map(|s| (*s).to_string()));
    repaired.push(base.to_string());
    repaired.extend(rest.iter().map(|s| s.replace('?', "%3F")));

    let mut query = QueryParams::parse(embedded);
    query.extend(QueryParams::parse(trailing));

    Some(NormalizedTarget {
        path: repaired.join("/"),
        query,
    })
}

/// Text after the last `?` is a trailing query only if it has no `/`
fn split_trailing_query(target: &str) -> (&str, &str) {
    match target.rsplit_once('?') {
        Some((path, query)) if !query.contains('/') => (path, query),
        _ => (target, ""),
    }
}

/// Rebuild the target an HTTP parser split at the first literal `?`.
///
/// Percent-encoded question marks in the path are decoded so both
/// `gpt-4%3Fsession=abc/chat` and `gpt-4?session=abc/chat` are seen alike.
fn request_target(uri: &Uri) -> String {
    let mut target = decode_question_marks(uri.path());
    if let Some(query) = uri.query() {
        target.push('?');
        target.push_str(query);
    }
    target
}

fn decode_question_marks(path: &str) -> String {
    if !path.contains('%') {
        return path.to_string();
    }
    path.replace("%3F", "?").replace("%3f", "?")
}

/// Repair a URI, keeping scheme and authority.
///
/// Returns `None` when nothing needs repair or the repaired target does not
/// form a valid URI.
#[must_use]
pub fn normalize_uri(uri: &Uri) -> Option<Uri> {
    let target = request_target(uri);
    let normalized = normalize_target(&target)?;
    let repaired = normalized.to_target();

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(repaired.parse().ok()?);
    Uri::from_parts(parts).ok()
}

/// Pipeline stage wrapping [`normalize_uri`]
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlNormalizer;

impl UrlNormalizer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Rewrite the request URI in place; returns whether it changed
    pub fn apply(self, request: &mut Request) -> bool {
        let Some(repaired) = normalize_uri(request.uri()) else {
            return false;
        };

        tracing::warn!(
            original = %request.uri(),
            rewritten = %repaired,
            "Relocated query string embedded in request path"
        );

        #[cfg(feature = "metrics")]
        crate::observability::record_url_repair();

        *request.uri_mut() = repaired;
        true
    }
}
