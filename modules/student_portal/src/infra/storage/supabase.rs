use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::domain::record::UserRecord;
use crate::domain::repo::{RecordStore, StoreError};
use modkit::TracedClient;

/// Reads the user data table through the Supabase PostgREST endpoint
/// (`<url>/rest/v1/<table>`), authenticating with the service-role key.
pub struct SupabaseRecordStore {
    client: TracedClient,
    endpoint: Url,
    key: String,
    page_size: u32,
}

impl SupabaseRecordStore {
    pub fn new(
        client: TracedClient,
        base_url: &str,
        service_role_key: impl Into<String>,
        table: &str,
        page_size: u32,
    ) -> Result<Self, StoreError> {
        let mut endpoint = Url::parse(base_url)
            .map_err(|e| StoreError::Config(format!("invalid store url '{base_url}': {e}")))?;
        endpoint
            .path_segments_mut()
            .map_err(|_| StoreError::Config(format!("store url '{base_url}' cannot be a base")))?
            .pop_if_empty()
            .extend(&["rest", "v1", table]);

        Ok(Self {
            client,
            endpoint,
            key: service_role_key.into(),
            page_size: page_size.max(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn fetch(&self, query: &[(&str, String)]) -> Result<Vec<Value>, StoreError> {
        let request = self
            .client
            .request(reqwest::Method::GET, self.endpoint.as_str())
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query);

        let response = self.client.send(request).await.map_err(|e| {
            if e.is_timeout() {
                StoreError::Timeout {
                    ms: self
                        .client
                        .timeout()
                        .map(|t| t.as_millis() as u64)
                        .unwrap_or_default(),
                }
            } else {
                StoreError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn fetch_rows(&self, query: &[(&str, String)]) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self
            .fetch(query)
            .await?
            .into_iter()
            .filter_map(UserRecord::from_value)
            .collect())
    }
}

#[async_trait]
impl RecordStore for SupabaseRecordStore {
    #[instrument(
        name = "student_portal.store.scan",
        skip_all,
        fields(endpoint = %self.endpoint, page_size = self.page_size)
    )]
    async fn scan(&self) -> Result<Vec<UserRecord>, StoreError> {
        let mut rows = Vec::new();
        let mut offset: u64 = 0;
        loop {
            let page = self
                .fetch_rows(&[
                    ("select", "*".to_string()),
                    ("limit", self.page_size.to_string()),
                    ("offset", offset.to_string()),
                ])
                .await?;
            let got = page.len();
            rows.extend(page);
            debug!(offset, got, "scan page");
            if got < self.page_size as usize {
                break;
            }
            offset += u64::from(self.page_size);
        }
        Ok(rows)
    }

    #[instrument(
        name = "student_portal.store.find_by_user_id",
        skip_all,
        fields(endpoint = %self.endpoint, user_id = %user_id)
    )]
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let rows = self
            .fetch_rows(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("limit", "1".to_string()),
            ])
            .await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(name = "student_portal.store.ping", skip_all, fields(endpoint = %self.endpoint))]
    async fn ping(&self) -> Result<(), StoreError> {
        self.fetch(&[("select", "user_id".to_string()), ("limit", "1".to_string())])
            .await
            .map(|_| ())
    }
}
