//! ResponseStream lifecycle tests: construction, close, iteration and races.

mod common;

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Barrier, mpsc};
use std::thread;
use std::time::Duration;

use zero_stream::{
    BytesInput, Column, Config, Error, Format, InputConnection, ResponseStream, ResponseSummary,
    SocketInput, Value,
};

use common::{FaultyInput, RejectingFactory, shared};

fn tsv() -> Arc<Config> {
    Arc::new(Config::with_format(Format::TabSeparated))
}

// === Construction ===

#[test]
fn test_defaults_when_nothing_supplied() {
    let response = ResponseStream::new(tsv(), BytesInput::new("")).unwrap();
    assert_eq!(response.query_id(), "");
    assert!(response.summary().is_empty());
    assert!(Arc::ptr_eq(response.summary(), &ResponseSummary::empty()));
    assert!(!response.is_closed());
}

#[test]
fn test_supplied_summary_and_query_id_are_kept() {
    let summary = ResponseSummary {
        read_rows: 10,
        read_bytes: 80,
        result_rows: 2,
        ..Default::default()
    };
    let response = ResponseStream::builder(tsv(), BytesInput::new("x\n"))
        .summary(summary)
        .query_id("3f0c-query")
        .build()
        .unwrap();
    assert_eq!(response.query_id(), "3f0c-query");
    assert_eq!(**response.summary(), summary);
}

#[test]
fn test_construction_failure_closes_input() {
    let input = shared(FaultyInput::new("a\tb\n1\t2\n").failing_read());
    let config = Arc::new(Config::with_format(Format::TabSeparatedWithNames));

    let err = ResponseStream::new(config, Arc::clone(&input)).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(input.is_closed());
    assert_eq!(input.close_calls(), 1);
}

#[test]
fn test_construction_failure_reports_original_error_when_close_fails() {
    let input = shared(FaultyInput::new("").failing_read().failing_close());
    let config = Arc::new(Config::with_format(Format::TabSeparatedWithNamesAndTypes));

    let err = ResponseStream::new(config, Arc::clone(&input)).unwrap_err();
    match err {
        Error::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(input.close_calls(), 1);
}

#[test]
fn test_rejecting_factory_closes_input() {
    let input = shared(BytesInput::new("anything"));
    let err = ResponseStream::builder(tsv(), Arc::clone(&input))
        .factory(RejectingFactory)
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert!(input.is_closed());
    assert_eq!(input.close_count(), 1);
}

#[test]
fn test_unsupported_format_closes_input() {
    let input = shared(BytesInput::new("{\"a\":1}\n"));
    let config = Arc::new(Config::with_format(Format::JSONEachRow));
    let err = ResponseStream::new(config, Arc::clone(&input)).unwrap_err();
    assert!(err.is_unsupported());
    assert!(input.is_closed());
}

// === Close ===

#[test]
fn test_ten_byte_body_closed_without_reading() {
    let input = shared(BytesInput::new("0123456789"));
    let response = ResponseStream::new(tsv(), Arc::clone(&input)).unwrap();

    assert!(response.close());
    assert!(response.is_closed());
    assert!(input.is_closed());
    assert_eq!(input.remaining(), 0);
}

#[test]
fn test_close_is_idempotent() {
    let input = shared(FaultyInput::new("a\nb\n"));
    let response = ResponseStream::new(tsv(), Arc::clone(&input)).unwrap();

    assert!(response.close());
    for _ in 0..5 {
        assert!(!response.close());
    }
    drop(response);
    assert_eq!(input.skip_calls(), 1);
    assert_eq!(input.close_calls(), 1);
}

#[test]
fn test_close_tolerates_drain_failure() {
    let input = shared(FaultyInput::new("a\nb\nc\n").failing_skip());
    let response = ResponseStream::new(tsv(), Arc::clone(&input)).unwrap();

    assert!(response.close());
    assert!(response.is_closed());
    assert!(input.is_closed());
    assert_eq!(input.skip_calls(), 1);
    assert_eq!(input.close_calls(), 1);
}

#[test]
fn test_close_failure_still_marks_closed() {
    let input = shared(FaultyInput::new("a\n").failing_close());
    let response = ResponseStream::new(tsv(), Arc::clone(&input)).unwrap();

    assert!(response.close());
    assert!(response.is_closed());
    assert!(!input.is_closed());

    // No second drain or close attempt, neither explicit nor on drop
    assert!(!response.close());
    drop(response);
    assert_eq!(input.skip_calls(), 1);
    assert_eq!(input.close_calls(), 1);
}

#[test]
fn test_drop_releases_unread_response() {
    let input = shared(BytesInput::new("a\nb\nc\n"));
    {
        let response = ResponseStream::new(tsv(), Arc::clone(&input)).unwrap();
        let mut records = response.records().unwrap();
        assert!(records.next().is_some());
    }
    assert!(input.is_closed());
    assert_eq!(input.remaining(), 0);
    assert_eq!(input.close_count(), 1);
}

#[test]
fn test_concurrent_close_releases_once() {
    let input = shared(FaultyInput::new("a\nb\n").slow_skip(Duration::from_millis(20)));
    let response = Arc::new(ResponseStream::new(tsv(), Arc::clone(&input)).unwrap());
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let response = Arc::clone(&response);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                response.close()
            })
        })
        .collect();

    let released: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(released.iter().filter(|r| **r).count(), 1);
    assert!(response.is_closed());
    assert_eq!(input.close_calls(), 1);
    assert_eq!(input.skip_calls(), 1);
}

#[test]
fn test_not_closed_until_connection_released() {
    let input = shared(FaultyInput::new("a\nb\n").slow_skip(Duration::from_millis(300)));
    let response = Arc::new(ResponseStream::new(tsv(), Arc::clone(&input)).unwrap());

    let closer = {
        let response = Arc::clone(&response);
        thread::spawn(move || response.close())
    };
    thread::sleep(Duration::from_millis(50));

    // Still draining: the connection is open and the response says so
    assert_eq!(input.skip_calls(), 1);
    assert_eq!(input.close_calls(), 0);
    assert!(!input.is_closed());
    assert!(!response.is_closed());
    // A second closer neither waits nor releases again
    assert!(!response.close());
    assert!(matches!(
        response.records().unwrap().next(),
        Some(Err(Error::Closed))
    ));

    assert!(closer.join().unwrap());
    assert!(response.is_closed());
    assert!(input.is_closed());
    assert_eq!(input.close_calls(), 1);
}

#[test]
fn test_close_while_another_thread_reads() {
    let (mut server, client) = UnixStream::pair().unwrap();
    server.write_all(b"1\n2\n").unwrap();

    let input = SocketInput::from(client);
    // Bounds the drain and the blocked read on a peer that never finishes
    input.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    let columns = vec![Column::of("n", "UInt8")];
    let response = Arc::new(
        ResponseStream::builder(tsv(), input)
            .columns(columns)
            .build()
            .unwrap(),
    );

    let (tx, rx) = mpsc::channel();
    let reader = {
        let response = Arc::clone(&response);
        thread::spawn(move || {
            let mut records = response.records_as::<(u8,)>().unwrap();
            let first = records.next().unwrap().unwrap();
            let second = records.next().unwrap().unwrap();
            tx.send(()).unwrap();
            // Blocks until the response is closed underneath
            let rest: Vec<_> = records.collect();
            (first, second, rest)
        })
    };

    rx.recv().unwrap();
    assert!(response.close());

    let (first, second, rest) = reader.join().unwrap();
    assert_eq!((first, second), ((1,), (2,)));
    assert!(rest.len() <= 1);
    if let Some(item) = rest.first() {
        assert!(matches!(item, Err(Error::Closed)));
    }
    assert!(response.is_closed());
    drop(server);
}

// === Iteration ===

#[test]
fn test_records_are_single_pass_and_in_order() {
    let input = shared(BytesInput::new("a\nb\nc\n"));
    let response = ResponseStream::new(tsv(), Arc::clone(&input)).unwrap();

    let first: Vec<Value> = response
        .records()
        .unwrap()
        .map(|r| r.unwrap().into_values().remove(0))
        .collect();
    assert_eq!(
        first,
        vec![
            Value::String("a".into()),
            Value::String("b".into()),
            Value::String("c".into()),
        ]
    );

    assert_eq!(response.records().unwrap().count(), 0);

    // Exhausting the records does not close anything
    assert!(!response.is_closed());
    assert!(!input.is_closed());
}

#[test]
fn test_records_mapped_into_tuples() {
    let config = Arc::new(Config::with_format(Format::TabSeparatedWithNamesAndTypes));
    let body = "id\tname\tscore\nUInt64\tString\tNullable(Float64)\n1\tann\t0.5\n2\tbo\\tb\t\\N\n";
    let response = ResponseStream::new(config, BytesInput::new(body)).unwrap();

    let rows: Vec<(u64, String, Option<f64>)> = response
        .records_as()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        rows,
        vec![(1, "ann".to_string(), Some(0.5)), (2, "bo\tb".to_string(), None)]
    );
}

#[test]
fn test_row_binary_records() {
    let mut body = Vec::new();
    body.extend_from_slice(&7u32.to_le_bytes());
    body.push(1);
    body.extend_from_slice(&8u32.to_le_bytes());
    body.push(0);

    let config = Arc::new(Config::try_from("clickhouse://localhost/?format=RowBinary").unwrap());
    let response = ResponseStream::builder(config, BytesInput::new(body))
        .columns(vec![Column::of("id", "UInt32"), Column::of("ok", "Bool")])
        .build()
        .unwrap();
    assert_eq!(response.format(), Format::RowBinary);

    let rows: Vec<(u32, bool)> = response
        .records_as()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows, vec![(7, true), (8, false)]);
}

#[test]
fn test_columns_keep_declared_order() {
    let declared = vec![
        Column::of("c", "String"),
        Column::of("a", "Int32"),
        Column::of("b", "Nullable(UInt8)"),
    ];
    let response = ResponseStream::builder(tsv(), BytesInput::new(""))
        .columns(declared.clone())
        .build()
        .unwrap();
    assert_eq!(response.columns().unwrap(), declared.as_slice());

    let config = Arc::new(Config::with_format(Format::TabSeparatedWithNames));
    let response = ResponseStream::new(config, BytesInput::new("z\ty\n")).unwrap();
    let names: Vec<&str> = response.columns().unwrap().iter().map(Column::name).collect();
    assert_eq!(names, vec!["z", "y"]);
}

#[test]
fn test_raw_bytes_bypass_processor() {
    let input = shared(BytesInput::new("not\ttsv\tat all"));
    let response = ResponseStream::new(tsv(), Arc::clone(&input)).unwrap();

    let mut body = String::new();
    response.reader().unwrap().read_to_string(&mut body).unwrap();
    assert_eq!(body, "not\ttsv\tat all");

    assert!(response.close());
    assert!(input.is_closed());
}
