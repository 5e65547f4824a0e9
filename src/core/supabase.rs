use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::core::config::SupabaseConfig;
use crate::core::{AppError, AppErrorType};

#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    #[error("request to supabase failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("supabase responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid login credentials")]
    InvalidCredentials,
}

impl From<SupabaseError> for AppError {
    fn from(error: SupabaseError) -> Self {
        match error {
            SupabaseError::InvalidCredentials => AppError::unauthorized("Invalid email or password"),
            other => AppError {
                cause: Some(other.to_string()),
                error_type: AppErrorType::StorageError,
                message: None,
            },
        }
    }
}

fn build_client(timeout_seconds: u64) -> Result<Client, SupabaseError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()?)
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SupabaseError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(SupabaseError::Status { status, body })
}

/// Object storage in the configured Supabase bucket, authenticated with the
/// service role key.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    service_key: Secret<String>,
    bucket: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub path: String,
    pub public_url: String,
}

#[derive(Serialize)]
struct RemoveObjects<'a> {
    prefixes: &'a [String],
}

impl SupabaseStorage {
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        Ok(Self {
            client: build_client(config.timeout_seconds)?,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_role_key.clone(),
            bucket: config.storage_bucket.clone(),
        })
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    #[tracing::instrument(name = "Upload object", skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, SupabaseError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.service_key.expose_secret())
            .header("apikey", self.service_key.expose_secret())
            .header("x-upsert", "false")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        ensure_success(response).await?;

        Ok(StoredObject {
            path: path.to_string(),
            public_url: self.public_url(path),
        })
    }

    #[tracing::instrument(name = "Remove objects", skip(self))]
    pub async fn remove(&self, paths: &[String]) -> Result<(), SupabaseError> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(self.service_key.expose_secret())
            .header("apikey", self.service_key.expose_secret())
            .json(&RemoveObjects { prefixes: paths })
            .send()
            .await?;
        ensure_success(response).await?;

        Ok(())
    }
}

/// Password sessions against Supabase Auth (GoTrue).
#[derive(Clone)]
pub struct SupabaseAuth {
    client: Client,
    base_url: String,
    anon_key: Secret<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Option<serde_json::Value>,
}

impl AuthUser {
    pub fn full_name(&self) -> Option<String> {
        self.user_metadata
            .as_ref()
            .and_then(|metadata| metadata.get("full_name"))
            .and_then(|name| name.as_str())
            .map(str::to_string)
    }
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

impl SupabaseAuth {
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        Ok(Self {
            client: build_client(config.timeout_seconds)?,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        })
    }

    #[tracing::instrument(name = "Password sign in", skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, SupabaseError> {
        let url = format!("{}/auth/v1/token", self.base_url);

        let response = self
            .client
            .post(&url)
            .query(&[("grant_type", "password")])
            .header("apikey", self.anon_key.expose_secret())
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED
        ) {
            return Err(SupabaseError::InvalidCredentials);
        }

        Ok(ensure_success(response).await?.json::<AuthSession>().await?)
    }

    #[tracing::instrument(name = "Sign out", skip(self, access_token))]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), SupabaseError> {
        let url = format!("{}/auth/v1/logout", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .header("apikey", self.anon_key.expose_secret())
            .send()
            .await?;
        ensure_success(response).await?;

        Ok(())
    }
}
