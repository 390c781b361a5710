//! Bearer-token authentication as handler decoration.
//!
//! [`Guard::protect`] wraps one handler at a time, so authentication is a
//! property of individual routes rather than a global filter:
//!
//! ```rust,no_run
//! # use storefront::{Error, Guard, Request, Response, Router};
//! # async fn list_orders(_: Request) -> Result<Response, Error> { Ok(Response::text("")) }
//! let guard = Guard::new(b"signing-key");
//! let app = Router::new().get("/orders", guard.protect(list_orders));
//! ```
//!
//! Tokens are HS256 JWTs. Every request is verified on its own; nothing is
//! cached between requests.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::handler::Handler;
use crate::request::Request;

const BEARER: &str = "bearer ";

/// Identity carried by a verified token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: String,
    pub email: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: u64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
}

/// Verifies bearer credentials and decorates handlers with that check.
///
/// Cheap to clone; clones share the verification key.
#[derive(Clone)]
pub struct Guard {
    inner: Arc<Verifier>,
}

struct Verifier {
    key: DecodingKey,
    validation: Validation,
}

impl Guard {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self { inner: Arc::new(Verifier { key: DecodingKey::from_secret(secret), validation }) }
    }

    /// Extracts and verifies the bearer credential of `req`.
    pub fn authenticate(&self, req: &Request) -> Result<Claims, Error> {
        let token = bearer_token(req).ok_or(Error::AuthenticationMissing)?;
        let data = jsonwebtoken::decode::<Claims>(token, &self.inner.key, &self.inner.validation)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature   => "token expired",
                    ErrorKind::ImmatureSignature  => "token not yet valid",
                    ErrorKind::InvalidSignature   => "signature mismatch",
                    ErrorKind::InvalidAlgorithm   => "unsupported algorithm",
                    ErrorKind::MissingRequiredClaim(_) => "required claim missing",
                    _                             => "malformed token",
                };
                debug!(path = req.path(), reason, "rejected bearer credential");
                Error::AuthenticationInvalid(reason)
            })?;
        Ok(data.claims)
    }

    /// Returns a handler that authenticates the request before delegating to
    /// `handler`. The wrapped handler's outcome is passed through unchanged.
    pub fn protect<H: Handler>(&self, handler: H) -> impl Handler + use<H> {
        let inner = handler.into_boxed_handler();
        let guard = self.clone();
        move |mut req: Request| {
            let inner = Arc::clone(&inner);
            let verdict = guard.authenticate(&req);
            async move {
                req.set_claims(verdict?);
                inner.call(req).await
            }
        }
    }
}

/// The token of an `Authorization: Bearer <token>` header. Other schemes and
/// empty tokens count as no credential at all.
fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.header("authorization")?;
    let scheme = value.get(..BEARER.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER) {
        return None;
    }
    let token = value[BEARER.len()..].trim();
    (!token.is_empty()).then_some(token)
}

/// Signs tokens the [`Guard`] will accept.
pub struct TokenIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self { key: EncodingKey::from_secret(secret), ttl }
    }

    pub fn issue(&self, account_id: u64, email: &str) -> Result<String, Error> {
        let iat = jsonwebtoken::get_current_timestamp();
        let exp = iat
            .checked_add(self.ttl.as_secs())
            .ok_or_else(|| anyhow::anyhow!("token lifetime of {:?} overflows the expiry", self.ttl))?;
        let claims = Claims { sub: account_id.to_string(), email: email.to_owned(), iat, exp };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| Error::Internal(e.into()))
    }
}
