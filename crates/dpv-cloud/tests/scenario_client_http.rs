//! HTTP client against a local mock server (no real cloud required).

use std::time::Duration;

use dpv_cloud::{
    CloudError, ConnectionProbe, Credentials, DeviceCloudClient, DeviceRequester, RecordFetcher,
    StreamAdmin,
};
use dpv_schemas::{FetchOrder, StreamId};
use httpmock::prelude::*;

const DEVICE: &str = "00000000-00000000-00409DFF-FF000001";

fn client(server: &MockServer) -> DeviceCloudClient {
    DeviceCloudClient::new(
        server.base_url(),
        Some(Credentials {
            username: "tester".to_string(),
            password: "not-a-real-password".to_string(),
        }),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[test]
fn fetch_sends_size_and_order_and_keeps_service_order() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET)
            .path(format!("/ws/DataPoint/{DEVICE}/incremental"))
            .query_param("size", "3")
            .query_param("order", "descending")
            .header_exists("authorization");
        then.status(200)
            .header("content-type", "application/json")
            .body(
                r#"{"resultSize":"3","items":[
                    {"data":"30","quality":"OK","location":"/a"},
                    {"data":"20","quality":"OK","location":"/a"},
                    {"data":"10","quality":"OK","location":"/a"}]}"#,
            );
    });

    let mut c = client(&server);
    let recs = c
        .fetch(
            &StreamId::new(DEVICE, "incremental"),
            3,
            FetchOrder::Descending,
        )
        .unwrap();

    m.assert();
    let data: Vec<&str> = recs.iter().map(|r| r.data.as_str()).collect();
    assert_eq!(data, vec!["30", "20", "10"]);
}

#[test]
fn fetch_server_error_is_api_error_with_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/ws/DataPoint/{DEVICE}/incremental"));
        then.status(500).body("internal");
    });

    let err = client(&server)
        .fetch(
            &StreamId::new(DEVICE, "incremental"),
            1,
            FetchOrder::Descending,
        )
        .unwrap_err();
    assert_eq!(
        err,
        CloudError::Api {
            status: Some(500),
            body: "internal".to_string()
        }
    );
}

#[test]
fn fetch_garbage_body_is_decode_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/ws/DataPoint/{DEVICE}/incremental"));
        then.status(200).body("<result/>");
    });

    let err = client(&server)
        .fetch(
            &StreamId::new(DEVICE, "incremental"),
            1,
            FetchOrder::Descending,
        )
        .unwrap_err();
    assert!(matches!(err, CloudError::Decode(_)));
}

#[test]
fn delete_stream_hits_data_stream_resource() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(DELETE)
            .path(format!("/ws/DataStream/{DEVICE}/incremental"));
        then.status(200);
    });

    client(&server)
        .delete_stream(&StreamId::new(DEVICE, "incremental"))
        .unwrap();
    m.assert();
}

#[test]
fn delete_missing_stream_is_not_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(DELETE);
        then.status(404).body("no such stream");
    });

    let err = client(&server)
        .delete_stream(&StreamId::new(DEVICE, "gone"))
        .unwrap_err();
    assert!(matches!(err, CloudError::NotFound(_)));
}

#[test]
fn device_request_posts_sci_and_returns_reply_text() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(POST)
            .path("/ws/sci")
            .body_contains("target_name=\"test_datapoint_send_datastream_with_datapoints\"")
            .body_contains("1;1;3;Integer;");
        then.status(200).body(
            r#"<sci_reply version="1.0"><data_service><device id="x"><requests><device_request target_name="t" status="0">Launch successful</device_request></requests></device></data_service></sci_reply>"#,
        );
    });

    let reply = client(&server)
        .send_device_request(
            DEVICE,
            "test_datapoint_send_datastream_with_datapoints",
            "1;1;3;Integer;",
        )
        .unwrap();
    m.assert();
    assert_eq!(reply, "Launch successful");
}

#[test]
fn connection_probe_reads_device_core() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/ws/DeviceCore")
            .query_param("condition", format!("devConnectwareId='{DEVICE}'"));
        then.status(200).body(format!(
            r#"{{"items":[{{"devConnectwareId":"{DEVICE}","dpConnectionStatus":"1"}}]}}"#
        ));
    });

    assert!(client(&server).is_connected(DEVICE).unwrap());
}

#[test]
fn credentials_debug_redacts_password() {
    let c = Credentials {
        username: "tester".to_string(),
        password: "hunter22hunter22".to_string(),
    };
    let dbg = format!("{c:?}");
    assert!(dbg.contains("tester"));
    assert!(!dbg.contains("hunter22"));
}
