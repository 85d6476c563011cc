//! Console batches read through a live pipe.
//!
//! Invariants under test:
//! - a batch ends at the terminator line and parses into records in emission order
//! - a missing terminator is a ReadTimeout, never a partial batch
//! - the thread-completion line is found among unrelated output
//! - malformed record lines surface as errors after the batch is complete

use std::thread;
use std::time::Duration;

use dpv_console::{
    read_batch, wait_thread_finished, ConsoleError, ConsoleStream, MalformedReason, RecordParser,
};
use dpv_schemas::{ConsoleRecord, RecordKind};
use dpv_testkit::{batch_text, binary_line, console_pipe, scalar_line};

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn scenario_batch_parses_in_emission_order() {
    let (tx, rx) = console_pipe();
    let mut console = ConsoleStream::spawn(rx).unwrap();

    tx.line("boot: starting upload thread");
    tx.write(&batch_text(&[
        scalar_line("/a", "OK", "10"),
        scalar_line("/a", "OK", "20"),
        scalar_line("/a", "OK", "30"),
    ]));

    let records = read_batch(&mut console, &RecordParser::default(), WAIT).unwrap();
    let data: Vec<&str> = records
        .iter()
        .map(|r| match r {
            ConsoleRecord::Scalar(s) => s.data.as_str(),
            ConsoleRecord::Binary(_) => panic!("unexpected binary record"),
        })
        .collect();
    assert_eq!(data, vec!["10", "20", "30"]);
    assert!(records.iter().all(|r| r.location() == "/a" && r.quality() == "OK"));
}

#[test]
fn scenario_batches_arriving_in_pieces_are_read_one_at_a_time() {
    let (tx, rx) = console_pipe();
    let mut console = ConsoleStream::spawn(rx).unwrap();
    let parser = RecordParser::default();

    let writer = thread::spawn(move || {
        for batch in 0..2 {
            for i in 0..3 {
                thread::sleep(Duration::from_millis(5));
                tx.line(&scalar_line("/a", "OK", &format!("{batch}{i}")));
            }
            tx.write(&batch_text::<&str>(&[]));
        }
        tx
    });

    let first = read_batch(&mut console, &parser, WAIT).unwrap();
    let second = read_batch(&mut console, &parser, WAIT).unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    match &second[0] {
        ConsoleRecord::Scalar(s) => assert_eq!(s.data, "10"),
        other => panic!("unexpected {other:?}"),
    }
    drop(writer.join().unwrap());
}

#[test]
fn scenario_missing_terminator_is_read_timeout() {
    let (tx, rx) = console_pipe();
    let mut console = ConsoleStream::spawn(rx).unwrap();
    tx.line(&scalar_line("/a", "OK", "10"));

    let err = read_batch(
        &mut console,
        &RecordParser::default(),
        Duration::from_millis(100),
    )
    .unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {err}");
    match err {
        ConsoleError::ReadTimeout { lines_buffered, .. } => assert_eq!(lines_buffered, 1),
        other => panic!("expected ReadTimeout, got {other}"),
    }
    drop(tx);
}

#[test]
fn scenario_binary_batch() {
    let (tx, rx) = console_pipe();
    let mut console = ConsoleStream::spawn(rx).unwrap();
    let (line, _) = binary_line("/bin", "0", b"\x01\x02\x03\x04");
    tx.write(&batch_text(&[line]));

    let records = read_batch(&mut console, &RecordParser::default(), WAIT).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind(), RecordKind::Binary);
    match &records[0] {
        ConsoleRecord::Binary(b) => {
            assert_eq!(b.crc32_decimal, "3057449933");
            assert_eq!(b.crc32_hex, "B63CFBCD");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn scenario_malformed_record_fails_the_batch() {
    let (tx, rx) = console_pipe();
    let mut console = ConsoleStream::spawn(rx).unwrap();
    tx.write(&batch_text(&["[DataPoint] Location: '/a' Data: '10'"]));

    match read_batch(&mut console, &RecordParser::default(), WAIT) {
        Err(ConsoleError::Malformed(m)) => {
            assert_eq!(m.reason, MalformedReason::MissingField("Quality"))
        }
        other => panic!("expected malformed record, got {other:?}"),
    }
}

#[test]
fn scenario_thread_finished_after_noise() {
    let (tx, rx) = console_pipe();
    let mut console = ConsoleStream::spawn(rx).unwrap();
    tx.line("upload: 50 batches sent");
    tx.line("Finished the Thread for stream incremental");

    let cap = wait_thread_finished(&mut console, WAIT).unwrap();
    assert_eq!(cap.lines.len(), 2);
    assert_eq!(
        cap.matched_line(),
        Some("Finished the Thread for stream incremental")
    );
}

#[test]
fn scenario_console_closed_before_terminator() {
    let (tx, rx) = console_pipe();
    let mut console = ConsoleStream::spawn(rx).unwrap();
    tx.line(&scalar_line("/a", "OK", "10"));
    drop(tx);

    let err = read_batch(&mut console, &RecordParser::default(), WAIT).unwrap_err();
    assert!(matches!(err, ConsoleError::Closed { .. }), "got {err}");
}
