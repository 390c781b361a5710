//! JSON request-body decoding.
//!
//! Runs before routing, so a malformed body is rejected before any guard or
//! handler sees the request.

use serde_json::Value;

use crate::error::Error;
use crate::method::Method;
use crate::request::Request;

/// Parses the body of a POST, PUT or PATCH request and attaches the result.
///
/// - other methods are left untouched;
/// - an empty (or all-whitespace) body decodes to `{}`, so missing fields are
///   reported by the handler as a validation failure;
/// - a body declared as something other than JSON (an image upload, a form)
///   is left undecoded;
/// - anything else must parse as JSON or the request fails with
///   [`Error::Decode`].
pub fn decode(req: &mut Request) -> Result<(), Error> {
    let carries_body = Method::try_from(req.method()).is_ok_and(Method::carries_body);
    if !carries_body {
        return Ok(());
    }
    if req.header("content-type").is_some_and(|ct| !is_json(ct)) {
        return Ok(());
    }
    if req.body().iter().all(u8::is_ascii_whitespace) {
        req.set_decoded(Value::Object(Default::default()));
        return Ok(());
    }

    let value: Value = serde_json::from_slice(req.body()).map_err(|e| Error::Decode(e.to_string()))?;
    req.set_decoded(value);
    Ok(())
}

/// `application/json`, `application/problem+json` and friends, parameters ignored.
fn is_json(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    let Some((kind, subtype)) = essence.split_once('/') else {
        return false;
    };
    kind.eq_ignore_ascii_case("application")
        && (subtype.eq_ignore_ascii_case("json") || subtype.to_ascii_lowercase().ends_with("+json"))
}
