//! REST client for the assessment-content service.
//!
//! | Operation         | Request                            |
//! |-------------------|------------------------------------|
//! | `update_item`     | `PUT /assessment-items/{id}` (XML) |
//! | `create_item`     | `POST /assessment-items` (XML)     |
//! | `delete_item`     | `DELETE /assessment-items/{id}`    |
//! | `update_stimulus` | `PUT /stimuli/{id}` (JSON)         |
//! | `create_stimulus` | `POST /stimuli` (JSON)             |
//! | `delete_stimulus` | `DELETE /stimuli/{id}`             |
//! | `validate_*`      | `POST /validate` (JSON)            |
//!
//! 404 maps to `ServiceError::NotFound`, any other non-2xx status to
//! `ServiceError::Rejected` carrying the response body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use qtigate_core::{
    application::{ApplicationError, ServiceError, ports::ContentService},
    error::QtiGateResult,
};

/// Longest response body quoted back in a rejection.
const MAX_REASON_LEN: usize = 500;

#[derive(Debug, Serialize)]
struct StimulusPayload<'a> {
    identifier: &'a str,
    title: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ValidatePayload<'a> {
    kind: &'a str,
    identifier: &'a str,
    xml: &'a str,
}

#[derive(Debug, Deserialize)]
struct ValidateVerdict {
    #[serde(default = "accepted")]
    valid: bool,
    #[serde(default)]
    errors: Vec<String>,
}

fn accepted() -> bool {
    true
}

/// Production content-service client.
#[derive(Debug, Clone)]
pub struct HttpContentService {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpContentService {
    /// Create a client for the service rooted at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> QtiGateResult<Self> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApplicationError::InvalidEndpoint {
                url: base_url,
                reason: "expected an absolute http(s) URL".into(),
            }
            .into());
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("qtigate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApplicationError::ClientSetup {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, resource: String) -> Result<Response, ServiceError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| ServiceError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        debug!(%resource, status = status.as_u16(), "content service responded");
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 404 {
            return Err(ServiceError::NotFound { resource });
        }
        let mut message = response
            .text()
            .await
            .unwrap_or_else(|e| format!("unreadable response body: {e}"));
        if message.len() > MAX_REASON_LEN {
            let cut = (0..=MAX_REASON_LEN)
                .rev()
                .find(|i| message.is_char_boundary(*i))
                .unwrap_or(0);
            message.truncate(cut);
        }
        Err(ServiceError::Rejected {
            status: Some(status.as_u16()),
            message,
        })
    }

    fn xml_body(request: RequestBuilder, xml: &str) -> RequestBuilder {
        request
            .header(CONTENT_TYPE, "application/xml")
            .body(xml.to_string())
    }

    async fn validate(&self, kind: &str, xml: &str, identifier: &str) -> Result<(), ServiceError> {
        let request = self.client.post(self.url("/validate")).json(&ValidatePayload {
            kind,
            identifier,
            xml,
        });
        let response = self.send(request, format!("{kind} '{identifier}'")).await?;
        let body = response.text().await.map_err(|e| ServiceError::Transport {
            message: format!("reading validation verdict: {e}"),
        })?;
        if body.trim().is_empty() {
            return Ok(());
        }
        let verdict: ValidateVerdict =
            serde_json::from_str(&body).map_err(|e| ServiceError::Transport {
                message: format!("malformed validation verdict: {e}"),
            })?;
        if verdict.valid {
            Ok(())
        } else {
            Err(ServiceError::Rejected {
                status: None,
                message: if verdict.errors.is_empty() {
                    "not accepted".into()
                } else {
                    verdict.errors.join("; ")
                },
            })
        }
    }
}

#[async_trait]
impl ContentService for HttpContentService {
    #[instrument(skip(self, xml))]
    async fn update_item(&self, identifier: &str, xml: &str) -> Result<(), ServiceError> {
        let request = Self::xml_body(
            self.client.put(self.url(&format!("/assessment-items/{identifier}"))),
            xml,
        );
        self.send(request, format!("item '{identifier}'")).await.map(drop)
    }

    #[instrument(skip_all)]
    async fn create_item(&self, xml: &str) -> Result<(), ServiceError> {
        let request = Self::xml_body(self.client.post(self.url("/assessment-items")), xml);
        self.send(request, "item".into()).await.map(drop)
    }

    #[instrument(skip(self))]
    async fn delete_item(&self, identifier: &str) -> Result<(), ServiceError> {
        let request = self
            .client
            .delete(self.url(&format!("/assessment-items/{identifier}")));
        self.send(request, format!("item '{identifier}'")).await.map(drop)
    }

    #[instrument(skip(self, content))]
    async fn update_stimulus(
        &self,
        identifier: &str,
        title: &str,
        content: &str,
    ) -> Result<(), ServiceError> {
        let request = self
            .client
            .put(self.url(&format!("/stimuli/{identifier}")))
            .json(&StimulusPayload {
                identifier,
                title,
                content,
            });
        self.send(request, format!("stimulus '{identifier}'")).await.map(drop)
    }

    #[instrument(skip(self, content))]
    async fn create_stimulus(
        &self,
        identifier: &str,
        title: &str,
        content: &str,
    ) -> Result<(), ServiceError> {
        let request = self.client.post(self.url("/stimuli")).json(&StimulusPayload {
            identifier,
            title,
            content,
        });
        self.send(request, format!("stimulus '{identifier}'")).await.map(drop)
    }

    #[instrument(skip(self))]
    async fn delete_stimulus(&self, identifier: &str) -> Result<(), ServiceError> {
        let request = self
            .client
            .delete(self.url(&format!("/stimuli/{identifier}")));
        self.send(request, format!("stimulus '{identifier}'")).await.map(drop)
    }

    #[instrument(skip(self, xml))]
    async fn validate_item(&self, xml: &str, identifier: &str) -> Result<(), ServiceError> {
        self.validate("item", xml, identifier).await
    }

    #[instrument(skip(self, xml))]
    async fn validate_test(&self, xml: &str, identifier: &str) -> Result<(), ServiceError> {
        self.validate("test", xml, identifier).await
    }
}
