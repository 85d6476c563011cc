//! Blocking HTTP client for the cloud REST and SCI endpoints.
//!
//! Credentials are handed in by the caller (read from the environment by the
//! CLI); the password is never logged or printed by `Debug`.

use std::fmt;
use std::time::Duration;

use dpv_schemas::{CloudRecord, FetchOrder, StreamId};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{debug, info};

use crate::sci::{device_request_body, parse_device_reply};
use crate::wire::{connection_status, normalize_page, RawDataPointPage, RawDeviceCorePage};
use crate::{CloudError, ConnectionProbe, DeviceRequester, RecordFetcher, StreamAdmin};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"REDACTED")
            .finish()
    }
}

/// One reusable session against the cloud service.
#[derive(Debug, Clone)]
pub struct DeviceCloudClient {
    http: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl DeviceCloudClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<Self, CloudError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CloudError::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(c) => req.basic_auth(&c.username, Some(&c.password)),
            None => req,
        }
    }

    fn get_json(&self, path: &str) -> RequestBuilder {
        self.authorized(self.http.get(self.url(path)))
            .header(ACCEPT, "application/json")
    }

    /// Read the body and map non-success statuses to `Api`.
    fn checked_body(resp: Response) -> Result<String, CloudError> {
        let status = resp.status();
        let body = resp.text()?;
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CloudError::NotFound(body));
        }
        if !status.is_success() {
            return Err(CloudError::Api {
                status: Some(status.as_u16()),
                body,
            });
        }
        Ok(body)
    }
}

impl RecordFetcher for DeviceCloudClient {
    fn fetch(
        &mut self,
        stream: &StreamId,
        count: usize,
        order: FetchOrder,
    ) -> Result<Vec<CloudRecord>, CloudError> {
        let path = format!("/ws/DataPoint/{}", stream.path());
        debug!(%stream, count, order = order.as_str(), "fetching data points");

        let resp = self
            .get_json(&path)
            .query(&[
                ("size", count.to_string()),
                ("order", order.as_str().to_string()),
            ])
            .send()?;
        let body = Self::checked_body(resp)?;

        let page: RawDataPointPage = serde_json::from_str(&body)
            .map_err(|e| CloudError::Decode(format!("data point page: {e}")))?;
        normalize_page(page)
    }
}

impl StreamAdmin for DeviceCloudClient {
    fn delete_stream(&mut self, stream: &StreamId) -> Result<(), CloudError> {
        let path = format!("/ws/DataStream/{}", stream.path());
        let resp = self
            .authorized(self.http.delete(self.url(&path)))
            .send()?;
        Self::checked_body(resp)?;
        info!(%stream, "data stream deleted");
        Ok(())
    }
}

impl DeviceRequester for DeviceCloudClient {
    fn send_device_request(
        &mut self,
        device_id: &str,
        target: &str,
        payload: &str,
    ) -> Result<String, CloudError> {
        let body = device_request_body(device_id, target, payload);
        debug!(device_id, target, "sending device request");

        let resp = self
            .authorized(self.http.post(self.url("/ws/sci")))
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()?;
        let reply = Self::checked_body(resp)?;
        parse_device_reply(&reply)
    }
}

impl ConnectionProbe for DeviceCloudClient {
    fn is_connected(&mut self, device_id: &str) -> Result<bool, CloudError> {
        let condition = format!("devConnectwareId='{device_id}'");
        let resp = self
            .get_json("/ws/DeviceCore")
            .query(&[("condition", condition.as_str())])
            .send()?;
        let body = Self::checked_body(resp)?;

        let page: RawDeviceCorePage = serde_json::from_str(&body)
            .map_err(|e| CloudError::Decode(format!("device core page: {e}")))?;
        connection_status(&page, device_id)
    }
}
