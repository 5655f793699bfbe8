use std::io::Cursor;

use triage_core::{Category, Event, EventAssembler, LineClassifier, ScanConfig};

fn ev(category: Category, value: Option<&str>, timestamp: Option<&str>) -> Event {
    Event {
        category,
        field_value: value.map(str::to_string),
        timestamp: timestamp.map(str::to_string),
    }
}

fn recover(bytes: &[u8], config: ScanConfig) -> Vec<Event> {
    let assembler = EventAssembler::new(LineClassifier::default(), config);
    let mut sink: Vec<Event> = Vec::new();
    assembler
        .process_file(Cursor::new(bytes), Some(bytes.len() as u64), &mut sink)
        .expect("in-memory scan");
    sink
}

/// Log records separated by the binary framing typical of a leveldb log.
fn corrupted_log() -> Vec<u8> {
    let records: [&[u8]; 9] = [
        b"2023-03-04 09:15:00.120 {\"hostname\":\"WIN-EVIDENCE\",\"version\":\"2.2310\"}",
        b"2023-03-04 09:15:01.001 \"action,presence,available\",\"me\"",
        b"2023-03-04 09:15:02.002 \"action,chatstate,composing\",\"0049170123456@c.us\"",
        b"2023-03-04 09:15:03.003 \"action,block,true,\"0049170123456@c.us\"",
        b"2023-03-04 09:15:04.004 \"action,battery,0,charging\"",
        b"2023-03-04 09:15:05.005 \"action,group,create\"",
        b"2023-03-04 09:15:06.006 \"action,msg,relay,image\",\"120363012345-1600000000@g.us\"",
        b"2023-03-04 09:15:07.007 window resized",
        b"2023-03-04 09:15:08.008 \"action,chat,read\",\"0000000000000@c.us\"",
    ];
    let mut bytes = vec![0x00, 0x13, 0x7f];
    for record in records {
        bytes.extend_from_slice(record);
        bytes.extend_from_slice(&[0x00, 0x01, b'o', b'k', 0xfe]);
    }
    bytes
}

#[test]
fn recovers_events_from_corrupted_log() {
    let events = recover(&corrupted_log(), ScanConfig::default());
    assert_eq!(
        events,
        vec![
            ev(Category::OnlineStatus, Some("available"), Some("2023-03-04 09:15:01.001")),
            ev(Category::ChatState, Some("composing"), Some("2023-03-04 09:15:02.002")),
            ev(Category::ContactBlocked, Some("49170123456 blocked"), Some("2023-03-04 09:15:03.003")),
            ev(Category::Battery, Some("0"), Some("2023-03-04 09:15:04.004")),
            ev(Category::GroupAction, Some("group created"), Some("2023-03-04 09:15:05.005")),
            ev(Category::MediaReceived, Some("120363012345 Image received"), Some("2023-03-04 09:15:06.006")),
            ev(Category::ReadAction, Some("Read msg from: 0"), Some("2023-03-04 09:15:08.008")),
        ]
    );
}

#[test]
fn chat_state_line_yields_single_event() {
    let line = b"\"action,chatstate,composing\",\"123456789012345@c.us\",2023-01-01 10:00:00.000";
    assert_eq!(
        recover(line, ScanConfig::default()),
        vec![ev(Category::ChatState, Some("composing"), Some("2023-01-01 10:00:00.000"))]
    );
}

#[test]
fn unterminated_last_line_depends_on_flush_policy() {
    let line = b"\x00\"action,group,delete\" 2023-01-01 10:00:00.000";
    assert_eq!(recover(line, ScanConfig::default()).len(), 1);

    let legacy = ScanConfig {
        flush_at_eof: false,
        ..ScanConfig::default()
    };
    assert!(recover(line, legacy).is_empty());
}

#[test]
fn unmarked_lines_produce_nothing() {
    let bytes = b"2023-01-01 10:00:00.000 renderer ready\x00short\x00";
    assert!(recover(bytes, ScanConfig::default()).is_empty());
}

#[test]
fn event_stream_matches_sink_output() {
    let bytes = corrupted_log();
    let assembler = EventAssembler::default();
    let streamed: Vec<Event> = assembler
        .events(Cursor::new(bytes.clone()), None)
        .collect::<Result<_, _>>()
        .expect("in-memory scan");
    assert_eq!(streamed, recover(&bytes, ScanConfig::default()));
}
