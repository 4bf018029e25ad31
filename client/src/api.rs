// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::config::ApiConfig;
use crate::error::{ClientError, Result, Timeouts};
use async_trait::async_trait;
use common::{Status, Task, TaskDraft};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// The remote task collection.
///
/// Every call is a single round trip with no retry. Implementations carry no
/// business logic beyond building the request and decoding the answer.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// `GET {base}`
    async fn list_all(&self) -> Result<Vec<Task>>;

    /// `GET {base}/status/{STATUS}`
    async fn list_by_status(&self, status: Status) -> Result<Vec<Task>>;

    /// `GET {base}/{id}`
    async fn get(&self, id: i64) -> Result<Task>;

    /// `GET {base}/completed`
    async fn list_completed(&self) -> Result<Vec<Task>>;

    /// `POST {base}` with the draft as JSON. Returns the task with its server-assigned id.
    async fn create(&self, draft: &TaskDraft) -> Result<Task>;

    /// `PUT {base}/{id}` with the full replacement payload.
    async fn update(&self, id: i64, draft: &TaskDraft) -> Result<Task>;

    /// `DELETE {base}/{id}`
    async fn delete(&self, id: i64) -> Result<()>;
}

/// [`TaskApi`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    http_client: Client,
    base_url: Url,
    timeouts: Timeouts,
}

impl HttpTaskApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ClientError::Config(format!("{e:#}")))?;

        let mut base_url = Url::parse(&config.base_url)?;
        // `http://host/api/tasks/` and `http://host/api/tasks` address the same collection.
        base_url
            .path_segments_mut()
            .map_err(|_| ClientError::Config(format!("`{}` cannot carry a path", config.base_url)))?
            .pop_if_empty();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .default_headers(headers)
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self {
            http_client,
            base_url,
            timeouts: Timeouts {
                request: config.timeout(),
                connect: config.connect_timeout(),
            },
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The collection URL with `segments` appended.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("`{}` cannot carry a path", self.base_url)))?
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("{} {}", method, url);
        self.http_client.request(method, url)
    }

    /// Sends the request and returns the response if its status is a success.
    /// `id` is the task the call addresses, used to report 404s as [`ClientError::NotFound`].
    async fn send(&self, builder: RequestBuilder, id: Option<i64>) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::from_transport(e, self.timeouts))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Could not read error body: {}", e);
                String::new()
            }
        };
        warn!("Task API answered {} for {:?}: {}", status, id, body);
        Err(ClientError::from_status(status, id, &body))
    }

    /// Reads the whole body, then decodes it, so that a malformed body is a
    /// decode error rather than a transport one.
    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        id: Option<i64>,
    ) -> Result<T> {
        let response = self.send(builder, id).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_transport(e, self.timeouts))?;
        serde_json::from_slice(&bytes).map_err(ClientError::decode)
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list_all(&self) -> Result<Vec<Task>> {
        let builder = self.request(Method::GET, self.url(&[])?);
        self.send_json(builder, None).await
    }

    async fn list_by_status(&self, status: Status) -> Result<Vec<Task>> {
        let builder = self.request(Method::GET, self.url(&["status", status.as_str()])?);
        self.send_json(builder, None).await
    }

    async fn get(&self, id: i64) -> Result<Task> {
        let builder = self.request(Method::GET, self.url(&[&id.to_string()])?);
        self.send_json(builder, Some(id)).await
    }

    async fn list_completed(&self) -> Result<Vec<Task>> {
        let builder = self.request(Method::GET, self.url(&["completed"])?);
        self.send_json(builder, None).await
    }

    async fn create(&self, draft: &TaskDraft) -> Result<Task> {
        let builder = self
            .request(Method::POST, self.url(&[])?)
            .header(CONTENT_TYPE, "application/json")
            .json(draft);
        self.send_json(builder, None).await
    }

    async fn update(&self, id: i64, draft: &TaskDraft) -> Result<Task> {
        let builder = self
            .request(Method::PUT, self.url(&[&id.to_string()])?)
            .header(CONTENT_TYPE, "application/json")
            .json(draft);
        self.send_json(builder, Some(id)).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let builder = self.request(Method::DELETE, self.url(&[&id.to_string()])?);
        // Any acknowledgement body is ignored.
        self.send(builder, Some(id)).await?;
        Ok(())
    }
}
