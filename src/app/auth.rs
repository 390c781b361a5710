use std::sync::Arc;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::State;
use crate::error::Error;
use crate::request::Request;
use crate::response::Json;
use crate::store::StoreError;

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub(super) struct AccountView {
    id: u64,
    email: String,
}

#[derive(Serialize)]
pub(super) struct TokenView {
    token: String,
}

pub(super) async fn sign_up(state: Arc<State>, req: Request) -> Result<(StatusCode, Json<AccountView>), Error> {
    let creds: Credentials = req.json()?;
    let email = creds.email.trim();
    if !email.contains('@') {
        return Err(Error::validation("email must be an email address"));
    }
    if creds.password.is_empty() {
        return Err(Error::validation("password must not be empty"));
    }

    let account = state.accounts.create(email, &hash_password(&creds.password)).await?;
    tracing::info!(account = account.id, "account created");
    Ok((StatusCode::CREATED, Json(AccountView { id: account.id, email: account.email })))
}

pub(super) async fn sign_in(state: Arc<State>, req: Request) -> Result<Json<TokenView>, Error> {
    const REJECTED: Error = Error::AuthenticationInvalid("email or password is incorrect");

    let creds: Credentials = req.json()?;
    let account = match state.accounts.find_by_email(creds.email.trim()).await {
        Ok(account) => account,
        Err(StoreError::NotFound(_)) => return Err(REJECTED),
        Err(e) => return Err(e.into()),
    };
    if !verify_password(&creds.password, &account.password_hash) {
        return Err(REJECTED);
    }

    let token = state.issuer.issue(account.id, &account.email)?;
    Ok(Json(TokenView { token }))
}

/// `<salt>$<sha256(salt || password)>`, hex encoded.
fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{salt}${}", digest(&salt, password))
}

fn verify_password(password: &str, stored: &str) -> bool {
    stored
        .split_once('$')
        .is_some_and(|(salt, expected)| digest(salt, password) == expected)
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}
