//! Test assertions for outbound responses.

use crate::context::MessageContext;

/// Asserts the outbound status.
pub fn assert_response_status(ctx: &MessageContext, expected: u16) {
    assert_eq!(
        ctx.response_status(),
        expected,
        "Expected response status {}, got {}",
        expected,
        ctx.response_status()
    );
}

/// Asserts the outbound body, compared as bytes.
pub fn assert_response_body(ctx: &MessageContext, expected: impl AsRef<[u8]>) {
    let expected = expected.as_ref();
    assert_eq!(
        ctx.response_body(),
        expected,
        "Expected response body {:?}, got {:?}",
        String::from_utf8_lossy(expected),
        String::from_utf8_lossy(ctx.response_body())
    );
}

/// Asserts an outbound header value, ignoring the header name's case.
pub fn assert_response_header(ctx: &MessageContext, name: &str, expected: &str) {
    assert_eq!(
        ctx.response_header(name),
        Some(expected),
        "Expected response header '{}' = {:?}. Headers: {:?}",
        name,
        expected,
        ctx.response_headers()
    );
}

/// Asserts the outbound fields still hold their initial values.
pub fn assert_response_untouched(ctx: &MessageContext) {
    assert!(
        ctx.response_status() == 200
            && ctx.response_headers().is_empty()
            && ctx.response_body().is_empty(),
        "Expected untouched response, got status {} with {} headers and {} body bytes",
        ctx.response_status(),
        ctx.response_headers().len(),
        ctx.response_body().len()
    );
}
