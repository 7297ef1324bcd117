//! HTTP [`DocumentStore`] for an Appwrite-compatible REST API.
//!
//! Documents live under `{endpoint}/databases/{database}/collections/{collection}/documents`.
//! Requests are authenticated with the project header plus either a server
//! API key or a user session JWT.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

use crate::config::ClientConfig;
use crate::error::{CollectionError, Result};
use crate::models::{NewOwnedCard, OwnedCard};
use crate::store::DocumentStore;

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const KEY_HEADER: &str = "X-Appwrite-Key";
const JWT_HEADER: &str = "X-Appwrite-JWT";

/// Generate a document id the way the Appwrite `ID.unique()` helper does:
/// hex seconds, five hex digits of sub-second time, then random hex padding.
pub fn unique_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    let mut rng = rand::thread_rng();
    let padding: String = (0..7)
        .map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect();
    format!("{:x}{:05x}{}", now.as_secs(), now.subsec_millis(), padding)
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Document store backed by the remote REST API.
pub struct RemoteStore {
    client: Client,
    endpoint: String,
    project_id: String,
    database_id: String,
    collection_id: String,
    api_key: Option<String>,
    jwt: Option<String>,
}

impl RemoteStore {
    /// Build a store from connection settings.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            database_id: config.database_id.clone(),
            collection_id: config.collection_id.clone(),
            api_key: config.api_key.clone(),
            jwt: None,
        })
    }

    /// Authenticate as a signed-in user instead of with a server key.
    pub fn with_jwt(mut self, jwt: impl Into<String>) -> Self {
        self.jwt = Some(jwt.into());
        self
    }

    /// URL of the collection's document list.
    pub fn documents_url(&self) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.endpoint, self.database_id, self.collection_id
        )
    }

    /// URL of a single document.
    pub fn document_url(&self, document_id: &str) -> String {
        format!("{}/{}", self.documents_url(), document_id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request.header(PROJECT_HEADER, &self.project_id);
        if let Some(key) = &self.api_key {
            request = request.header(KEY_HEADER, key);
        }
        if let Some(jwt) = &self.jwt {
            request = request.header(JWT_HEADER, jwt);
        }
        request
    }

    async fn read_document(resp: Response) -> Result<OwnedCard> {
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.message)
                .unwrap_or(text);
            return Err(CollectionError::Remote {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }
}

impl DocumentStore for RemoteStore {
    async fn create_document(&self, document_id: String, data: NewOwnedCard) -> Result<OwnedCard> {
        let body = json!({ "documentId": document_id, "data": data });
        let resp = self
            .authorize(self.client.post(self.documents_url()))
            .json(&body)
            .send()
            .await?;
        Self::read_document(resp).await
    }

    async fn update_document(&self, document_id: String, amount_owned: u32) -> Result<OwnedCard> {
        let body = json!({ "data": { "amount_owned": amount_owned } });
        let resp = self
            .authorize(self.client.patch(self.document_url(&document_id)))
            .json(&body)
            .send()
            .await?;
        Self::read_document(resp).await
    }
}
