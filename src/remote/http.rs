//! `reqwest`-backed implementation of the remote API boundary.
//!
//! Endpoint shapes follow the upstream REST conventions: list endpoints
//! return a JSON array with an `opc-next-page` continuation header, the
//! search endpoint wraps its results in an `items` envelope, and deletes
//! return an empty success body.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use super::{Page, RemoteClient, RemoteError};
use crate::config::{ConfigError, RemoteConfig};
use crate::model::{BackupKind, LifecycleState, RemoteRecord};

/// Header carrying the continuation token on list responses.
const NEXT_PAGE_HEADER: &str = "opc-next-page";

/// HTTP client for the resource-management API.
pub struct HttpRemoteClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
    page_limit: u32,
}

impl HttpRemoteClient {
    /// Build a client from configuration. The bearer token is resolved from
    /// the environment variable named in the config; absence means
    /// unauthenticated calls.
    pub fn new(config: &RemoteConfig) -> Result<Self, ConfigError> {
        if config.endpoint.is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }

        // A trailing slash makes Url::join treat the last segment as a
        // directory instead of replacing it.
        let mut endpoint = config.endpoint.clone();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        let base = Url::parse(&endpoint).map_err(|source| ConfigError::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            source,
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let token = std::env::var(&config.auth_token_env).ok();

        Ok(Self {
            http,
            base,
            token,
            page_limit: config.page_limit,
        })
    }

    fn url(&self, path: &str) -> Result<Url, RemoteError> {
        self.base
            .join(path)
            .map_err(|e| RemoteError::InvalidResponse(format!("bad request path {path}: {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn backup_path(kind: BackupKind) -> &'static str {
        match kind {
            BackupKind::Boot => "bootVolumeBackups",
            BackupKind::Block => "volumeBackups",
        }
    }
}

/// Map a non-success status onto the error taxonomy.
fn error_for_status(status: StatusCode, context: &str) -> RemoteError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => RemoteError::RateLimited,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => RemoteError::Timeout,
        StatusCode::NOT_FOUND => RemoteError::NotFound(context.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RemoteError::PermissionDenied(context.to_string())
        }
        StatusCode::CONFLICT => RemoteError::Conflict(context.to_string()),
        s if s.is_server_error() => RemoteError::Server(s.as_u16()),
        s => RemoteError::InvalidResponse(format!("unexpected status {s} for {context}")),
    }
}

fn check(response: Response, context: &str) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(error_for_status(status, context))
    }
}

fn next_token(response: &Response) -> Option<String> {
    response
        .headers()
        .get(NEXT_PAGE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[derive(Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    items: Vec<RemoteRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompartmentDto {
    id: String,
    name: String,
    #[serde(default)]
    compartment_id: String,
    #[serde(default)]
    lifecycle_state: LifecycleState,
    #[serde(default)]
    time_created: Option<DateTime<Utc>>,
}

impl From<CompartmentDto> for RemoteRecord {
    fn from(dto: CompartmentDto) -> Self {
        RemoteRecord {
            identifier: dto.id,
            resource_type: "Compartment".to_string(),
            display_name: dto.name,
            compartment_id: dto.compartment_id,
            region: String::new(),
            time_created: dto.time_created,
            lifecycle_state: dto.lifecycle_state,
            defined_tags: BTreeMap::new(),
            freeform_tags: BTreeMap::new(),
            parent_id: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupDto {
    id: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    compartment_id: String,
    #[serde(default)]
    lifecycle_state: LifecycleState,
    #[serde(default)]
    time_created: Option<DateTime<Utc>>,
    #[serde(default)]
    volume_id: Option<String>,
    #[serde(default)]
    boot_volume_id: Option<String>,
    #[serde(default)]
    defined_tags: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    freeform_tags: BTreeMap<String, String>,
}

impl BackupDto {
    fn into_record(self, kind: BackupKind) -> RemoteRecord {
        let resource_type = match kind {
            BackupKind::Boot => "BootVolumeBackup",
            BackupKind::Block => "VolumeBackup",
        };
        RemoteRecord {
            identifier: self.id,
            resource_type: resource_type.to_string(),
            display_name: self.display_name,
            compartment_id: self.compartment_id,
            region: String::new(),
            time_created: self.time_created,
            lifecycle_state: self.lifecycle_state,
            defined_tags: self.defined_tags,
            freeform_tags: self.freeform_tags,
            parent_id: self.boot_volume_id.or(self.volume_id),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenancyDto {
    id: String,
    name: String,
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn search_resources(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<Page, RemoteError> {
        let url = self.url("resources/search")?;

        let mut body = serde_json::json!({
            "type": "Structured",
            "query": query,
            "limit": self.page_limit,
        });
        if let Some(token) = page_token {
            body["page"] = serde_json::Value::String(token.to_string());
        }

        let response = self
            .authorize(self.http.post(url).json(&body))
            .send()
            .await?;
        let response = check(response, "resource search")?;
        let token = next_token(&response);
        let envelope: SearchEnvelope = response.json().await?;

        Ok(Page {
            records: envelope.items,
            next_token: token,
        })
    }

    async fn list_compartments(
        &self,
        parent_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page, RemoteError> {
        let url = self.url("compartments")?;
        let limit = self.page_limit.to_string();
        let mut params = vec![("compartmentId", parent_id), ("limit", limit.as_str())];
        if let Some(token) = page_token {
            params.push(("page", token));
        }

        let response = self
            .authorize(self.http.get(url).query(&params))
            .send()
            .await?;
        let response = check(response, parent_id)?;
        let token = next_token(&response);
        let compartments: Vec<CompartmentDto> = response.json().await?;

        Ok(Page {
            records: compartments.into_iter().map(RemoteRecord::from).collect(),
            next_token: token,
        })
    }

    async fn get_tenancy(&self, tenancy_id: &str) -> Result<RemoteRecord, RemoteError> {
        let url = self.url(&format!("tenancies/{tenancy_id}"))?;

        let response = self.authorize(self.http.get(url)).send().await?;
        let response = check(response, tenancy_id)?;
        let tenancy: TenancyDto = response.json().await?;

        Ok(RemoteRecord::named(tenancy.id, tenancy.name))
    }

    async fn list_backups(
        &self,
        kind: BackupKind,
        compartment_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page, RemoteError> {
        let url = self.url(Self::backup_path(kind))?;
        let limit = self.page_limit.to_string();
        let mut params = vec![("compartmentId", compartment_id), ("limit", limit.as_str())];
        if let Some(token) = page_token {
            params.push(("page", token));
        }

        let response = self
            .authorize(self.http.get(url).query(&params))
            .send()
            .await?;
        let response = check(response, compartment_id)?;
        let token = next_token(&response);
        let backups: Vec<BackupDto> = response.json().await?;

        Ok(Page {
            records: backups
                .into_iter()
                .map(|dto| dto.into_record(kind))
                .collect(),
            next_token: token,
        })
    }

    async fn delete_backup(&self, kind: BackupKind, identifier: &str) -> Result<(), RemoteError> {
        let url = self.url(&format!("{}/{identifier}", Self::backup_path(kind)))?;

        let response = self.authorize(self.http.delete(url)).send().await?;
        check(response, identifier)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client_for(server: &MockServer) -> HttpRemoteClient {
        let config = RemoteConfig {
            endpoint: server.uri(),
            // points at a variable no test sets, so calls go out unauthenticated
            auth_token_env: "CLOUDKEEPER_TEST_TOKEN_UNSET".to_string(),
            timeout_secs: 5,
            page_limit: 100,
        };
        HttpRemoteClient::new(&config).unwrap()
    }

    #[test]
    fn new_rejects_empty_endpoint() {
        let config = RemoteConfig::default();
        assert!(matches!(
            HttpRemoteClient::new(&config),
            Err(ConfigError::MissingEndpoint)
        ));
    }

    #[tokio::test]
    async fn search_reads_items_and_next_page_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/resources/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(NEXT_PAGE_HEADER, "token-b")
                    .set_body_json(json!({
                        "items": [
                            {"identifier": "ocid1.instance.oc1..a", "displayName": "web-01"},
                            {"identifier": "ocid1.instance.oc1..b", "displayName": "web-02"}
                        ]
                    })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let page = client
            .search_resources("query all resources", None)
            .await
            .unwrap();

        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].identifier, "ocid1.instance.oc1..a");
        assert_eq!(page.next_token.as_deref(), Some("token-b"));
    }

    #[tokio::test]
    async fn list_backups_maps_dto_and_parent_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/volumeBackups"))
            .and(query_param("compartmentId", "ocid1.compartment.oc1..c"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": "ocid1.volumebackup.oc1..b1",
                    "displayName": "nightly-1",
                    "lifecycleState": "AVAILABLE",
                    "timeCreated": "2024-05-01T00:00:00Z",
                    "volumeId": "ocid1.volume.oc1..v1"
                }
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let page = client
            .list_backups(BackupKind::Block, "ocid1.compartment.oc1..c", None)
            .await
            .unwrap();

        assert_eq!(page.records.len(), 1);
        let record = &page.records[0];
        assert_eq!(record.identifier, "ocid1.volumebackup.oc1..b1");
        assert_eq!(record.resource_type, "VolumeBackup");
        assert_eq!(record.lifecycle_state, LifecycleState::Available);
        assert_eq!(record.parent_id.as_deref(), Some("ocid1.volume.oc1..v1"));
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn list_backups_passes_page_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bootVolumeBackups"))
            .and(query_param("page", "token-b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let page = client
            .list_backups(BackupKind::Boot, "ocid1.compartment.oc1..c", Some("token-b"))
            .await
            .unwrap();
        assert!(page.records.is_empty());
    }

    #[tokio::test]
    async fn list_compartments_maps_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/compartments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "ocid1.compartment.oc1..dev", "name": "dev", "lifecycleState": "ACTIVE"}
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let page = client
            .list_compartments("ocid1.tenancy.oc1..root", None)
            .await
            .unwrap();

        assert_eq!(page.records[0].display_name, "dev");
        assert_eq!(page.records[0].resource_type, "Compartment");
    }

    #[tokio::test]
    async fn delete_succeeds_on_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/volumeBackups/ocid1.volumebackup.oc1..b1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client
            .delete_backup(BackupKind::Block, "ocid1.volumebackup.oc1..b1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn status_codes_classify_into_taxonomy() {
        let server = MockServer::start().await;
        for (status, id) in [(429, "b429"), (404, "b404"), (503, "b503"), (403, "b403")] {
            Mock::given(method("DELETE"))
                .and(path(format!("/volumeBackups/{id}")))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;
        }
        let client = client_for(&server).await;

        let err = client.delete_backup(BackupKind::Block, "b429").await.unwrap_err();
        assert!(matches!(err, RemoteError::RateLimited));
        assert!(err.is_transient());

        let err = client.delete_backup(BackupKind::Block, "b404").await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
        assert!(!err.is_transient());

        let err = client.delete_backup(BackupKind::Block, "b503").await.unwrap_err();
        assert!(matches!(err, RemoteError::Server(503)));
        assert!(err.is_transient());

        let err = client.delete_backup(BackupKind::Block, "b403").await.unwrap_err();
        assert!(matches!(err, RemoteError::PermissionDenied(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn get_tenancy_returns_named_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tenancies/ocid1.tenancy.oc1..root"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(
                {"id": "ocid1.tenancy.oc1..root", "name": "acme"}
            )))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let tenancy = client.get_tenancy("ocid1.tenancy.oc1..root").await.unwrap();
        assert_eq!(tenancy.display_name, "acme");
    }
}
