//! inventory::netbox
//!
//! NetBox implementation of [`Inventory`] over the REST API.
//!
//! # Design
//!
//! Every list endpoint is paginated (`count`, `next`, `results`). Pages are
//! followed one after another through their `next` links. With threading on,
//! the first page is fetched alone to learn `count` and the remaining pages
//! are requested concurrently by offset, then stitched back in order.
//!
//! # Authentication
//!
//! Requests carry `Authorization: Token <token>`. 401 and 403 both map to
//! [`InventoryError::AuthFailed`].
//!
//! # Example
//!
//! ```ignore
//! use netboxgit::inventory::netbox::NetBoxClient;
//! use netboxgit::inventory::Inventory;
//!
//! let client = NetBoxClient::new("https://netbox.example.com", "0123456789abcdef")?;
//! let interfaces = client.interfaces_by_tag("release-42").await?;
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::traits::{
    Device, InterfacePayloads, InterfaceUpdate, Inventory, InventoryError, Tag, UpdateStatus,
};
use crate::core::config::NetBoxSettings;
use crate::core::records::InterfaceRecord;

/// Objects requested per page.
pub const PAGE_SIZE: usize = 100;

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("nbgit/", env!("CARGO_PKG_VERSION"));

/// One page of a NetBox list endpoint.
#[derive(Debug, Deserialize)]
struct Page<T> {
    count: usize,
    #[serde(default)]
    next: Option<String>,
    results: Vec<T>,
}

/// Error body returned by NetBox.
#[derive(Debug, Deserialize)]
struct NetBoxErrorResponse {
    detail: String,
}

/// A client for one NetBox instance.
#[derive(Clone)]
pub struct NetBoxClient {
    client: Client,
    /// Base URL without trailing slash, e.g. `https://netbox.example.com`
    base: String,
    token: String,
    /// Fetch pages concurrently
    threading: bool,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for NetBoxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetBoxClient")
            .field("base", &self.base)
            .field("has_token", &!self.token.is_empty())
            .field("threading", &self.threading)
            .finish()
    }
}

impl NetBoxClient {
    /// Client with certificate verification on and sequential paging.
    pub fn new(url: &str, token: impl Into<String>) -> Result<Self, InventoryError> {
        Self::build(url, token.into(), true, false)
    }

    /// Client configured from resolved settings.
    pub fn from_settings(settings: &NetBoxSettings) -> Result<Self, InventoryError> {
        Self::build(
            &settings.url,
            settings.token.clone(),
            settings.ssl_verify,
            settings.threading,
        )
    }

    fn build(
        url: &str,
        token: String,
        ssl_verify: bool,
        threading: bool,
    ) -> Result<Self, InventoryError> {
        if !ssl_verify {
            warn!(url, "TLS certificate verification is disabled");
        }
        let client = Client::builder()
            .danger_accept_invalid_certs(!ssl_verify)
            .build()
            .map_err(|e| InventoryError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base: url.trim_end_matches('/').to_string(),
            token,
            threading,
        })
    }

    /// Turn concurrent page fetching on or off.
    pub fn with_threading(mut self, threading: bool) -> Self {
        self.threading = threading;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    fn headers(&self) -> Result<HeaderMap, InventoryError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Token {}", self.token)).map_err(|_| {
            InventoryError::AuthFailed("token contains characters not allowed in a header".into())
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        Ok(headers)
    }

    /// Build URL for an API endpoint, e.g. `dcim/devices/3/`.
    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<T, InventoryError> {
        let response = self
            .client
            .get(url)
            .headers(self.headers()?)
            .query(query)
            .send()
            .await
            .map_err(|e| InventoryError::Network(e.to_string()))?;
        handle_response(response).await
    }

    /// Fetch every object of a list endpoint.
    async fn list<T>(&self, path: &str, filters: &[(String, String)]) -> Result<Vec<T>, InventoryError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = self.api_url(path);
        let mut query = filters.to_vec();
        query.push(("limit".into(), PAGE_SIZE.to_string()));

        let first: Page<T> = self.get_json(&url, &query).await?;
        debug!(path, count = first.count, "listing");
        let count = first.count;
        let mut results = first.results;

        if self.threading && first.next.is_some() {
            let headers = self.headers()?;
            let mut pages = JoinSet::new();
            for (index, offset) in (PAGE_SIZE..count).step_by(PAGE_SIZE).enumerate() {
                let client = self.client.clone();
                let url = url.clone();
                let headers = headers.clone();
                let mut query = query.clone();
                query.push(("offset".into(), offset.to_string()));
                pages.spawn(async move {
                    let response = client
                        .get(&url)
                        .headers(headers)
                        .query(&query)
                        .send()
                        .await
                        .map_err(|e| InventoryError::Network(e.to_string()))?;
                    let page: Page<T> = handle_response(response).await?;
                    Ok::<_, InventoryError>((index, page.results))
                });
            }

            let mut fetched = Vec::new();
            while let Some(joined) = pages.join_next().await {
                let page = joined.map_err(|e| InventoryError::Network(e.to_string()))??;
                fetched.push(page);
            }
            fetched.sort_by_key(|(index, _)| *index);
            for (_, page) in fetched {
                results.extend(page);
            }
        } else {
            let mut next = first.next;
            while let Some(url) = next {
                // `next` already carries every query parameter
                let page: Page<T> = self.get_json(&url, &[]).await?;
                results.extend(page.results);
                next = page.next;
            }
        }

        if results.len() != count {
            warn!(path, expected = count, received = results.len(), "object count changed while paging");
        }
        Ok(results)
    }

    async fn patch_interface(&self, id: u64, payload: &Map<String, Value>) -> Result<(), InventoryError> {
        let response = self
            .client
            .patch(self.api_url(&format!("dcim/interfaces/{id}/")))
            .headers(self.headers()?)
            .json(payload)
            .send()
            .await
            .map_err(|e| InventoryError::Network(e.to_string()))?;
        let _: Value = handle_response(response).await?;
        Ok(())
    }
}

/// Handle API response, mapping errors appropriately.
async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, InventoryError> {
    let status = response.status();
    if status.is_success() {
        response
            .json()
            .await
            .map_err(|e| InventoryError::InvalidPayload(format!("failed to parse response: {e}")))
    } else {
        Err(handle_error_response(response, status).await)
    }
}

/// Map an error response from the API.
async fn handle_error_response(response: Response, status: StatusCode) -> InventoryError {
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<NetBoxErrorResponse>(&body) {
        Ok(err) => err.detail,
        Err(_) if body.trim().is_empty() => "Unknown error".to_string(),
        Err(_) => body.trim().to_string(),
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => InventoryError::AuthFailed(message),
        StatusCode::NOT_FOUND => InventoryError::NotFound(message),
        _ if status.is_server_error() => InventoryError::Api {
            status: status.as_u16(),
            message: format!("NetBox server error: {message}"),
        },
        _ => InventoryError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl Inventory for NetBoxClient {
    fn name(&self) -> &'static str {
        "netbox"
    }

    async fn tag(&self, slug: &str) -> Result<Tag, InventoryError> {
        let mut tags: Vec<Tag> = self
            .list("extras/tags/", &[("slug".into(), slug.to_string())])
            .await?;
        match tags.len() {
            0 => Err(InventoryError::NotFound(format!("tag '{slug}'"))),
            1 => Ok(tags.remove(0)),
            n => Err(InventoryError::Ambiguous(format!("{n} tags match '{slug}'"))),
        }
    }

    async fn interfaces_by_tag(&self, tag: &str) -> Result<Vec<InterfaceRecord>, InventoryError> {
        let raw: Vec<Map<String, Value>> = self
            .list("dcim/interfaces/", &[("tag".into(), tag.to_string())])
            .await?;
        raw.into_iter()
            .map(|fields| {
                InterfaceRecord::new(fields).map_err(|e| InventoryError::InvalidPayload(e.to_string()))
            })
            .collect()
    }

    async fn device(&self, id: u64) -> Result<Device, InventoryError> {
        self.get_json(&self.api_url(&format!("dcim/devices/{id}/")), &[])
            .await
    }

    async fn update_interfaces(
        &self,
        device: &str,
        payloads: &InterfacePayloads,
    ) -> Result<Vec<InterfaceUpdate>, InventoryError> {
        if payloads.is_empty() {
            return Ok(Vec::new());
        }

        let mut filters = vec![("device".to_string(), device.to_string())];
        filters.extend(payloads.keys().map(|name| ("name".to_string(), name.clone())));
        let existing: Vec<Map<String, Value>> = self.list("dcim/interfaces/", &filters).await?;

        let mut results = Vec::with_capacity(payloads.len());
        for (name, payload) in payloads {
            let id = existing
                .iter()
                .find(|fields| fields.get("name").and_then(Value::as_str) == Some(name))
                .and_then(|fields| fields.get("id"))
                .and_then(Value::as_u64);

            let status = match id {
                None => UpdateStatus::Missing,
                Some(id) => match self.patch_interface(id, payload).await {
                    Ok(()) => UpdateStatus::Updated,
                    Err(e) => UpdateStatus::Failed(e.to_string()),
                },
            };
            results.push(InterfaceUpdate {
                device: device.to_string(),
                interface: name.clone(),
                status,
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_token() {
        let client = NetBoxClient::new("https://netbox.test/", "secret-token").unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("has_token: true"));
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = NetBoxClient::new("https://netbox.test/", "t").unwrap();
        assert_eq!(client.base_url(), "https://netbox.test");
        assert_eq!(
            client.api_url("/dcim/devices/3/"),
            "https://netbox.test/api/dcim/devices/3/"
        );
    }

    #[test]
    fn header_rejects_newline_in_token() {
        let client = NetBoxClient::new("https://netbox.test", "bad\ntoken").unwrap();
        assert!(matches!(
            client.headers(),
            Err(InventoryError::AuthFailed(_))
        ));
    }

    #[test]
    fn settings_carry_threading() {
        let settings = NetBoxSettings {
            url: "https://netbox.test".into(),
            token: "t".into(),
            ssl_verify: false,
            threading: true,
        };
        let client = NetBoxClient::from_settings(&settings).unwrap();
        assert!(client.threading);
        assert!(!client.with_threading(false).threading);
    }

    #[test]
    fn page_parses_without_next() {
        let page: Page<Tag> = serde_json::from_str(
            r#"{"count": 1, "next": null, "previous": null,
                "results": [{"id": 1, "name": "Release 42", "slug": "release-42"}]}"#,
        )
        .unwrap();
        assert_eq!(page.count, 1);
        assert!(page.next.is_none());
        assert_eq!(page.results[0].slug, "release-42");
    }
}
