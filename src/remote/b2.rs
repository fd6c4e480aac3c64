//! Backblaze B2 Object Store
//!
//! Implements the transport contract over the B2 native API. Authorized
//! sessions are cached per access key so a listing run authorizes once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use moka::sync::Cache;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::errors::RemoteError;
use super::types::{
    B2ListBucketsResponse, B2ListFilesResponse, BucketDescriptor, ObjectPage,
};
use super::ObjectStore;
use crate::vault::Credential;

/// B2 API base URL for authorization (v3 for nested apiInfo structure)
const B2_AUTH_URL: &str = "https://api.backblazeb2.com/b2api/v3/b2_authorize_account";

/// HTTP client timeout, bounds a single stalled page fetch
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of retries for retryable errors
const MAX_RETRIES: u32 = 3;

/// B2 caps maxFileCount per call
const MAX_PAGE_SIZE: u32 = 10_000;

/// B2 auth tokens last 24 hours; refresh a little earlier
const SESSION_TTL: Duration = Duration::from_secs(23 * 60 * 60);

/// Response from b2_authorize_account
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeAccountResponse {
    account_id: String,
    authorization_token: String,
    api_info: ApiInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiInfo {
    storage_api: StorageApiInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageApiInfo {
    api_url: String,
}

/// Request body for b2_list_file_names
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListFileNamesRequest {
    bucket_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    max_file_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_file_name: Option<String>,
}

/// Authorized account session
struct Session {
    /// Secret the session was authorized with
    secret: String,
    account_id: String,
    auth_token: String,
    api_url: String,
}

/// B2 transport shared by all principals
#[derive(Clone)]
pub struct B2Store {
    http_client: Client,
    /// Authorized sessions by access key ID
    sessions: Cache<String, Arc<Session>>,
}

impl B2Store {
    pub fn new() -> Result<Self, RemoteError> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Request(format!("Failed to create HTTP client: {}", e)))?;

        let sessions = Cache::builder()
            .time_to_live(SESSION_TTL)
            .name("b2_sessions")
            .build();

        Ok(Self {
            http_client,
            sessions,
        })
    }

    /// Authorize with B2 using the credential's key pair
    async fn authorize(&self, credential: &Credential) -> Result<Arc<Session>, RemoteError> {
        info!(key_id = %credential.access_key_id, "Authorizing with B2 API...");

        let pair = format!(
            "{}:{}",
            credential.access_key_id, credential.secret_access_key
        );
        let encoded = base64::engine::general_purpose::STANDARD.encode(pair);
        let auth_header = format!("Basic {}", encoded);

        let response = self
            .http_client
            .get(B2_AUTH_URL)
            .header("Authorization", &auth_header)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            // Any rejection of the key pair at this endpoint is an auth failure
            return Err(match status {
                400 | 401 => RemoteError::Unauthorized(body),
                _ => RemoteError::from_status(status, &body),
            });
        }

        let auth: AuthorizeAccountResponse = response.json().await?;
        let session = Arc::new(Session {
            secret: credential.secret_access_key.clone(),
            account_id: auth.account_id,
            auth_token: auth.authorization_token,
            api_url: auth.api_info.storage_api.api_url,
        });

        debug!(api_url = %session.api_url, "B2 authorization successful");
        self.sessions
            .insert(credential.access_key_id.clone(), Arc::clone(&session));
        Ok(session)
    }

    /// Cached session for a credential, authorizing if needed
    async fn session(&self, credential: &Credential) -> Result<Arc<Session>, RemoteError> {
        match self.sessions.get(&credential.access_key_id) {
            Some(session) if session.secret == credential.secret_access_key => Ok(session),
            _ => self.authorize(credential).await,
        }
    }

    /// POST a JSON body to a B2 API call with retry and token refresh
    async fn call<B, T>(&self, credential: &Credential, api: &str, body: &B) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let backoff_ms = [500u64, 1000, 2000];
        let mut refreshed = false;
        let mut attempt = 0;

        loop {
            let session = self.session(credential).await?;
            match self.post_once(&session, api, body).await {
                Ok(result) => return Ok(result),
                Err(RemoteError::Unauthorized(_)) if !refreshed => {
                    warn!(operation = api, "Auth token rejected, re-authorizing...");
                    self.sessions.invalidate(&credential.access_key_id);
                    refreshed = true;
                }
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    let delay = backoff_ms
                        .get(attempt as usize)
                        .copied()
                        .unwrap_or(2000);
                    attempt += 1;
                    warn!(
                        operation = api,
                        attempt = attempt,
                        max = MAX_RETRIES,
                        delay_ms = delay,
                        error = %e,
                        "Retrying B2 operation"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_once<B, T>(&self, session: &Session, api: &str, body: &B) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/b2api/v2/{}", session.api_url, api);
        let response = self
            .http_client
            .post(&url)
            .header("Authorization", &session.auth_token)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::from_status(status, &body));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ObjectStore for B2Store {
    async fn validate_credential(
        &self,
        credential: &Credential,
    ) -> Result<Vec<BucketDescriptor>, RemoteError> {
        if !credential.is_well_formed() {
            return Err(RemoteError::Unauthorized(
                "key ID and application key are required".to_string(),
            ));
        }
        // Force a fresh authorization rather than trusting a cached session
        self.sessions.invalidate(&credential.access_key_id);
        self.authorize(credential).await?;
        self.list_buckets(credential).await
    }

    async fn list_buckets(
        &self,
        credential: &Credential,
    ) -> Result<Vec<BucketDescriptor>, RemoteError> {
        let session = self.session(credential).await?;
        let response: B2ListBucketsResponse = self
            .call(
                credential,
                "b2_list_buckets",
                &serde_json::json!({ "accountId": session.account_id }),
            )
            .await?;

        let buckets: Vec<BucketDescriptor> = response
            .buckets
            .into_iter()
            .map(BucketDescriptor::from)
            .collect();
        debug!(count = buckets.len(), "Listed buckets from B2");
        Ok(buckets)
    }

    async fn list_objects_page(
        &self,
        bucket: &BucketDescriptor,
        prefix: Option<&str>,
        credential: &Credential,
        continuation: Option<&str>,
        page_size: u32,
    ) -> Result<ObjectPage, RemoteError> {
        let request = ListFileNamesRequest {
            bucket_id: bucket.id.clone(),
            prefix: prefix.map(String::from),
            max_file_count: page_size.clamp(1, MAX_PAGE_SIZE),
            start_file_name: continuation.map(String::from),
        };

        debug!(bucket = %bucket.name, prefix = ?prefix, start = ?continuation, "Listing page from B2");

        let response: B2ListFilesResponse = self
            .call(credential, "b2_list_file_names", &request)
            .await?;
        Ok(ObjectPage::from(response))
    }

    async fn delete_object(
        &self,
        bucket: &BucketDescriptor,
        key: &str,
        credential: &Credential,
    ) -> Result<(), RemoteError> {
        // B2 deletes by file ID, so resolve the key first
        let page = self
            .list_objects_page(bucket, Some(key), credential, Some(key), 1)
            .await?;
        let file_id = page
            .objects
            .into_iter()
            .find(|o| o.key == key)
            .and_then(|o| o.version_id)
            .ok_or_else(|| RemoteError::NotFound(key.to_string()))?;

        info!(bucket = %bucket.name, file = key, "Deleting file from B2");
        let _: serde_json::Value = self
            .call(
                credential,
                "b2_delete_file_version",
                &serde_json::json!({ "fileName": key, "fileId": file_id }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_request_serialization() {
        let request = ListFileNamesRequest {
            bucket_id: "test-bucket".to_string(),
            prefix: Some("folder/".to_string()),
            max_file_count: 1000,
            start_file_name: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("bucketId"));
        assert!(json.contains("maxFileCount"));
        assert!(json.contains("prefix"));
        assert!(!json.contains("startFileName"));
    }

    #[test]
    fn test_authorize_response_parsing() {
        let json = r#"{
            "accountId": "acc1",
            "authorizationToken": "tok",
            "apiInfo": {"storageApi": {"apiUrl": "https://api004.backblazeb2.com", "downloadUrl": "https://f004.backblazeb2.com"}}
        }"#;
        let auth: AuthorizeAccountResponse = serde_json::from_str(json).unwrap();
        assert_eq!(auth.account_id, "acc1");
        assert_eq!(auth.api_info.storage_api.api_url, "https://api004.backblazeb2.com");
    }

    #[tokio::test]
    async fn test_malformed_credential_rejected_without_network() {
        let store = B2Store::new().unwrap();
        let result = store
            .validate_credential(&Credential::new("", "", "us-west-004"))
            .await;
        assert!(matches!(result, Err(RemoteError::Unauthorized(_))));
    }
}
