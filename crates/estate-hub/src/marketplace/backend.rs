//! HTTP gateways to the hosted backend's auth and object storage endpoints.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use super::session::{SessionError, SessionResolver, SessionUser};
use super::uploads::{ObjectStorage, StorageError, StoredObject};
use crate::config::BackendConfig;

fn api_key_headers(anon_key: &str) -> Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();
    let key = HeaderValue::from_str(anon_key).map_err(|err| err.to_string())?;
    headers.insert("apikey", key);
    Ok(headers)
}

fn bearer(token: &str) -> Result<HeaderValue, String> {
    HeaderValue::from_str(&format!("Bearer {token}")).map_err(|err| err.to_string())
}

/// Resolves access tokens through `<url>/auth/v1/user`.
#[derive(Debug, Clone)]
pub struct HostedAuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct AuthUserPayload {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl HostedAuthClient {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
        }
    }
}

#[async_trait::async_trait]
impl SessionResolver for HostedAuthClient {
    async fn resolve(&self, token: &str) -> Result<Option<SessionUser>, SessionError> {
        let mut headers = api_key_headers(&self.anon_key).map_err(SessionError::Upstream)?;
        match bearer(token) {
            Ok(value) => headers.insert(AUTHORIZATION, value),
            // A token that cannot be sent as a header cannot belong to a session.
            Err(_) => return Ok(None),
        };

        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.base_url))
            .headers(headers)
            .send()
            .await
            .map_err(|err| SessionError::Upstream(err.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let payload: AuthUserPayload = response
                    .json()
                    .await
                    .map_err(|err| SessionError::Upstream(err.to_string()))?;
                Ok(Some(SessionUser {
                    id: payload.id,
                    email: payload.email.unwrap_or_default(),
                }))
            }
            status => Err(SessionError::Upstream(format!(
                "unexpected status {status} from auth endpoint"
            ))),
        }
    }
}

/// Uploads into `<url>/storage/v1/object/<bucket>/<path>`.
#[derive(Debug, Clone)]
pub struct HostedStorageClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    bucket: String,
}

impl HostedStorageClient {
    pub fn new(config: &BackendConfig, bucket: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
            bucket: bucket.into(),
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{path}",
            self.base_url, self.bucket
        )
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{path}", self.base_url, self.bucket)
    }

    fn headers(&self) -> Result<HeaderMap, StorageError> {
        let mut headers = api_key_headers(&self.anon_key).map_err(StorageError::Backend)?;
        headers.insert(
            AUTHORIZATION,
            bearer(&self.anon_key).map_err(StorageError::Backend)?,
        );
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl ObjectStorage for HostedStorageClient {
    async fn put(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, StorageError> {
        let mut headers = self.headers()?;
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(content_type)
                .map_err(|err| StorageError::Backend(err.to_string()))?,
        );
        headers.insert("x-upsert", HeaderValue::from_static("true"));

        let response = self
            .http
            .post(self.object_url(path))
            .headers(headers)
            .body(bytes)
            .send()
            .await
            .map_err(|err| StorageError::Backend(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(StoredObject {
            path: path.to_string(),
            public_url: self.public_url(path),
        })
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let response = self
            .http
            .delete(self.object_url(path))
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|err| StorageError::Backend(err.to_string()))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
