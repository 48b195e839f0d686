//! Authorization header redaction
//!
//! Header values can show up in logs and error messages. They are reduced to
//! the scheme plus at most four credential characters first.

/// Shortest value that may reveal anything
const MIN_REVEAL_LEN: usize = 10;

/// Credential characters left visible
const REVEALED_CHARS: usize = 4;

/// Redact an `Authorization` header value.
///
/// - shorter than 10 characters or no `scheme token` shape: fully masked
/// - token shorter than 10 characters: scheme kept, token fully masked
/// - otherwise: scheme and the first 4 token characters kept
///
/// Lengths are counted in characters.
pub fn redact_auth_header(value: &str) -> String {
    let total = value.chars().count();
    let Some((scheme, token)) = value.split_once(' ') else {
        return mask(total);
    };
    if total < MIN_REVEAL_LEN {
        return mask(total);
    }

    let token_len = token.chars().count();
    if token_len < MIN_REVEAL_LEN {
        return format!("{scheme} {}", mask(token_len));
    }

    let visible: String = token.chars().take(REVEALED_CHARS).collect();
    format!("{scheme} {visible}{}", mask(token_len - REVEALED_CHARS))
}

fn mask(len: usize) -> String {
    "*".repeat(len)
}
