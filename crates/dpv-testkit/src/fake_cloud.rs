//! In-memory cloud service.
//!
//! Stores records per stream in upload order and answers fetches the way the
//! REST API does. Failures are scripted, never random.

use std::collections::{BTreeMap, VecDeque};

use dpv_cloud::{CloudError, ConnectionProbe, DeviceRequester, RecordFetcher, StreamAdmin};
use dpv_schemas::{CloudRecord, FetchOrder, StreamId};

/// One `fetch` as received by a fake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchCall {
    pub stream: StreamId,
    pub count: usize,
    pub order: FetchOrder,
}

/// Fetcher that returns scripted pages in order.
///
/// Once the script runs out, `fallback` answers every further call.
pub struct ScriptedFetcher {
    pages: VecDeque<Result<Vec<CloudRecord>, CloudError>>,
    fallback: Result<Vec<CloudRecord>, CloudError>,
    calls: Vec<FetchCall>,
}

impl ScriptedFetcher {
    pub fn new(pages: Vec<Result<Vec<CloudRecord>, CloudError>>) -> Self {
        Self {
            pages: pages.into(),
            fallback: Err(CloudError::Transport("no scripted response".to_string())),
            calls: Vec::new(),
        }
    }

    /// Every fetch fails with `err`.
    pub fn always_failing(err: CloudError) -> Self {
        Self::new(Vec::new()).with_fallback(Err(err))
    }

    /// Every fetch returns `page`.
    pub fn always(page: Vec<CloudRecord>) -> Self {
        Self::new(Vec::new()).with_fallback(Ok(page))
    }

    pub fn with_fallback(mut self, fallback: Result<Vec<CloudRecord>, CloudError>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn calls(&self) -> &[FetchCall] {
        &self.calls
    }
}

impl RecordFetcher for ScriptedFetcher {
    fn fetch(
        &mut self,
        stream: &StreamId,
        count: usize,
        order: FetchOrder,
    ) -> Result<Vec<CloudRecord>, CloudError> {
        self.calls.push(FetchCall {
            stream: stream.clone(),
            count,
            order,
        });
        self.pages
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Device request as received by [`FakeCloud`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceRequestCall {
    pub device_id: String,
    pub target: String,
    pub payload: String,
}

/// Cloud service with stored streams, stream deletion, device requests and a
/// connection flag.
pub struct FakeCloud {
    streams: BTreeMap<StreamId, Vec<CloudRecord>>,
    failing_fetches: VecDeque<CloudError>,
    delete_error: Option<CloudError>,
    reply: Result<String, CloudError>,
    connected: bool,
    fetches: Vec<FetchCall>,
    deleted: Vec<StreamId>,
    requests: Vec<DeviceRequestCall>,
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCloud {
    pub fn new() -> Self {
        Self {
            streams: BTreeMap::new(),
            failing_fetches: VecDeque::new(),
            delete_error: None,
            reply: Ok("Launch successful".to_string()),
            connected: true,
            fetches: Vec::new(),
            deleted: Vec::new(),
            requests: Vec::new(),
        }
    }

    /// Append records to a stream as if the device uploaded them in order.
    pub fn upload(&mut self, stream: &StreamId, records: impl IntoIterator<Item = CloudRecord>) {
        self.streams
            .entry(stream.clone())
            .or_default()
            .extend(records);
    }

    /// The next `n` fetches fail with `err` before any data is returned.
    pub fn fail_next_fetches(&mut self, n: usize, err: CloudError) {
        self.failing_fetches
            .extend(std::iter::repeat(err).take(n));
    }

    pub fn fail_deletes_with(&mut self, err: CloudError) {
        self.delete_error = Some(err);
    }

    pub fn set_reply(&mut self, reply: Result<String, CloudError>) {
        self.reply = reply;
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn stored(&self, stream: &StreamId) -> &[CloudRecord] {
        self.streams.get(stream).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fetches(&self) -> &[FetchCall] {
        &self.fetches
    }

    pub fn deleted(&self) -> &[StreamId] {
        &self.deleted
    }

    pub fn requests(&self) -> &[DeviceRequestCall] {
        &self.requests
    }
}

impl RecordFetcher for FakeCloud {
    fn fetch(
        &mut self,
        stream: &StreamId,
        count: usize,
        order: FetchOrder,
    ) -> Result<Vec<CloudRecord>, CloudError> {
        self.fetches.push(FetchCall {
            stream: stream.clone(),
            count,
            order,
        });
        if let Some(err) = self.failing_fetches.pop_front() {
            return Err(err);
        }

        let stored = self.stored(stream);
        let page = match order {
            FetchOrder::Ascending => stored.iter().take(count).cloned().collect(),
            FetchOrder::Descending => stored.iter().rev().take(count).cloned().collect(),
        };
        Ok(page)
    }
}

impl StreamAdmin for FakeCloud {
    fn delete_stream(&mut self, stream: &StreamId) -> Result<(), CloudError> {
        if let Some(err) = &self.delete_error {
            return Err(err.clone());
        }
        if self.streams.remove(stream).is_none() {
            return Err(CloudError::NotFound(stream.to_string()));
        }
        self.deleted.push(stream.clone());
        Ok(())
    }
}

impl DeviceRequester for FakeCloud {
    fn send_device_request(
        &mut self,
        device_id: &str,
        target: &str,
        payload: &str,
    ) -> Result<String, CloudError> {
        self.requests.push(DeviceRequestCall {
            device_id: device_id.to_string(),
            target: target.to_string(),
            payload: payload.to_string(),
        });
        self.reply.clone()
    }
}

impl ConnectionProbe for FakeCloud {
    fn is_connected(&mut self, _device_id: &str) -> Result<bool, CloudError> {
        Ok(self.connected)
    }
}
