//! Narrow interfaces the verification code uses to talk to the cloud service.
//!
//! Every method takes `&mut self`: one session is reused for sequential calls
//! and is never shared between concurrent reconciliations.

use dpv_schemas::{CloudRecord, FetchOrder, StreamId};

use crate::CloudError;

/// Source of the most recent records of a stream.
pub trait RecordFetcher {
    /// Fetch at most `count` records of `stream`, ordered by time as `order` asks.
    fn fetch(
        &mut self,
        stream: &StreamId,
        count: usize,
        order: FetchOrder,
    ) -> Result<Vec<CloudRecord>, CloudError>;
}

/// Stream lifecycle operations.
pub trait StreamAdmin {
    fn delete_stream(&mut self, stream: &StreamId) -> Result<(), CloudError>;
}

/// Sends a device request (SCI `data_service`) to a target on the device and
/// returns the text of the device's reply.
pub trait DeviceRequester {
    fn send_device_request(
        &mut self,
        device_id: &str,
        target: &str,
        payload: &str,
    ) -> Result<String, CloudError>;
}

/// Reports whether the cloud currently sees the device as connected.
pub trait ConnectionProbe {
    fn is_connected(&mut self, device_id: &str) -> Result<bool, CloudError>;
}

impl<T: RecordFetcher + ?Sized> RecordFetcher for &mut T {
    fn fetch(
        &mut self,
        stream: &StreamId,
        count: usize,
        order: FetchOrder,
    ) -> Result<Vec<CloudRecord>, CloudError> {
        (**self).fetch(stream, count, order)
    }
}

impl<T: RecordFetcher + ?Sized> RecordFetcher for Box<T> {
    fn fetch(
        &mut self,
        stream: &StreamId,
        count: usize,
        order: FetchOrder,
    ) -> Result<Vec<CloudRecord>, CloudError> {
        (**self).fetch(stream, count, order)
    }
}

impl<T: StreamAdmin + ?Sized> StreamAdmin for &mut T {
    fn delete_stream(&mut self, stream: &StreamId) -> Result<(), CloudError> {
        (**self).delete_stream(stream)
    }
}

impl<T: DeviceRequester + ?Sized> DeviceRequester for &mut T {
    fn send_device_request(
        &mut self,
        device_id: &str,
        target: &str,
        payload: &str,
    ) -> Result<String, CloudError> {
        (**self).send_device_request(device_id, target, payload)
    }
}

impl<T: ConnectionProbe + ?Sized> ConnectionProbe for Box<T> {
    fn is_connected(&mut self, device_id: &str) -> Result<bool, CloudError> {
        (**self).is_connected(device_id)
    }
}
