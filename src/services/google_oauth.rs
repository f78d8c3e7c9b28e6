// src/services/google_oauth.rs
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AppError, Result};

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// The fields of a service account JSON key file we actually use
#[derive(Debug, Deserialize)]
pub struct ServiceAccountKey {
    pub private_key: String,
    pub client_email: String,
    pub token_uri: String,
}

/// Assertion signed with the service account key; `aud` is the key's own token endpoint.
#[derive(Debug, Serialize)]
struct GrantAssertion<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Google caps assertion lifetime at one hour.
const ASSERTION_LIFETIME_MINUTES: i64 = 59;

pub fn load_service_account(path: &Path) -> Result<ServiceAccountKey> {
    if !path.exists() {
        return Err(AppError::MissingCredential(path.display().to_string()));
    }
    let json_bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&json_bytes)?)
}

fn sign_assertion(key: &ServiceAccountKey) -> Result<String> {
    let issued = Utc::now();
    let assertion = GrantAssertion {
        iss: &key.client_email,
        scope: SPREADSHEETS_SCOPE,
        aud: &key.token_uri,
        exp: (issued + Duration::minutes(ASSERTION_LIFETIME_MINUTES)).timestamp(),
        iat: issued.timestamp(),
    };
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    Ok(encode(&Header::new(Algorithm::RS256), &assertion, &signing_key)?)
}

/// Bearer token for the Sheets API, exchanged from the key file at `service_account_json_path`.
pub async fn fetch_access_token_from_file(client: &Client, service_account_json_path: &Path) -> Result<String> {
    let key = load_service_account(service_account_json_path)?;
    let assertion = sign_assertion(&key)?;

    debug!("Requesting a spreadsheets token for {}", key.client_email);
    let token: AccessToken = client
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(token.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_key_file_is_reported() {
        let err = load_service_account(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, AppError::MissingCredential(_)));
    }

    #[test]
    fn reads_the_fields_it_needs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type":"service_account","project_id":"p","private_key":"KEY","client_email":"bot@p.iam","token_uri":"https://oauth2.example/token"}}"#
        )
        .unwrap();
        let key = load_service_account(file.path()).unwrap();
        assert_eq!(key.client_email, "bot@p.iam");
        assert_eq!(key.token_uri, "https://oauth2.example/token");
    }

    #[tokio::test]
    async fn unusable_private_key_fails_before_any_token_request() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"private_key":"not a pem","client_email":"bot@p.iam","token_uri":"{}/token"}}"#,
            server.uri()
        )
        .unwrap();

        let err = fetch_access_token_from_file(&Client::new(), file.path()).await.unwrap_err();
        assert!(matches!(err, AppError::Jwt(_)));
    }
}
