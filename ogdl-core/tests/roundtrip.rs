//! Binary codec and log store round-trips.

use ogdl_core::{BinReader, Graph, Log, Payload};

// =============================================================================
// Binary codec
// =============================================================================

#[test]
fn wire_bytes_for_basic_nesting() {
    let g = Graph::parse("a\n  b\n  c\n").unwrap();
    let bytes = g.to_binary().unwrap();
    assert_eq!(
        bytes,
        [
            0x01, 0x47, 0x00, // header
            0x01, 0x01, 0x01, b'a', // level 1, string, len 1
            0x02, 0x01, 0x01, b'b', // level 2
            0x02, 0x01, 0x01, b'c', // level 2
            0x00, // end of object
        ]
    );
}

#[test]
fn parse_encode_decode_is_identity() {
    for input in [
        "a\n  b\n  c\n",
        "config\n  host localhost\n  port 8080\nusers\n  ada\n  lin\n",
        "a b c\nd e, f\n",
        "deep\n  e1\n    e2\n      e3\n        e4\n",
    ] {
        let g = Graph::parse(input).unwrap();
        let again = Graph::from_binary(&g.to_binary().unwrap()).unwrap();
        assert_eq!(again, g, "binary round-trip failed for {input:?}");
    }
}

#[test]
fn typed_payloads_round_trip() {
    let mut g = Graph::nil();
    g.add("counts").add_node(Graph::new(Payload::Int(-300)));
    g.add("flag").add_node(Graph::new(Payload::Bool(true)));
    g.add("raw")
        .add_node(Graph::new(Payload::Bytes(vec![0, 159, 146, 150])));
    g.add("nothing").add_node(Graph::new(Payload::Nil));
    let again = Graph::from_binary(&g.to_binary().unwrap()).unwrap();
    assert_eq!(again, g);
}

#[test]
fn nonempty_root_payload_is_emitted() {
    let mut g = Graph::new("root");
    g.add("child");
    let again = Graph::from_binary(&g.to_binary().unwrap()).unwrap();
    // the root comes back as the first node under the implicit container
    assert_eq!(again.len(), 1);
    assert_eq!(again.get(0).unwrap().string(), "root");
    assert_eq!(again.get(0).unwrap().get(0).unwrap().string(), "child");
}

#[test]
fn reader_counts_bytes() {
    let g = Graph::parse("a\n  b\n").unwrap();
    let bytes = g.to_binary().unwrap();
    let mut r = BinReader::new(bytes.as_slice());
    r.read_graph().unwrap();
    assert_eq!(r.bytes_read(), bytes.len());
}

#[test]
fn read_raw_returns_exact_wire_bytes() {
    let g = Graph::parse("a\n  b\n").unwrap();
    let bytes = g.to_binary().unwrap();
    let mut r = BinReader::new(bytes.as_slice());
    assert_eq!(r.read_raw().unwrap(), bytes);
}

#[test]
fn consecutive_objects_in_one_stream() {
    let g1 = Graph::parse("first 1\n").unwrap();
    let g2 = Graph::parse("second 2\n").unwrap();
    let mut stream = g1.to_binary().unwrap();
    stream.extend(g2.to_binary().unwrap());

    let mut r = BinReader::new(stream.as_slice());
    assert_eq!(r.read_graph().unwrap(), g1);
    let first_len = r.bytes_read();
    let mut r2 = BinReader::new(&stream[first_len..]);
    assert_eq!(r2.read_graph().unwrap(), g2);
}

// =============================================================================
// Log store
// =============================================================================

#[test]
fn append_then_read_in_offset_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = Log::open(dir.path().join("objects.log")).unwrap();

    let t1 = Graph::parse("first\n  payload 1\n").unwrap();
    let t2 = Graph::parse("second\n  payload 2\n").unwrap();

    let off1 = log.append(&t1).unwrap();
    let off2 = log.append(&t2).unwrap();
    assert_eq!(off1, 0);
    assert!(off2 > 0);

    let (got1, next) = log.read(0).unwrap();
    assert_eq!(got1, t1);
    assert_eq!(next, Some(off2));

    let (got2, next) = log.read(off2).unwrap();
    assert_eq!(got2, t2);
    assert_eq!(next, None);
}

#[test]
fn append_raw_and_read_raw() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = Log::open(dir.path().join("raw.log")).unwrap();

    let t = Graph::parse("x 1\n").unwrap();
    let bytes = t.to_binary().unwrap();
    let off = log.append_raw(&bytes).unwrap();

    let (raw, next) = log.read_raw(off).unwrap();
    assert_eq!(raw, bytes);
    assert_eq!(next, None);

    let (tree, _) = log.read(off).unwrap();
    assert_eq!(tree, t);
}

#[test]
fn log_scan_visits_every_record() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = Log::open(dir.path().join("scan.log")).unwrap();
    log.set_auto_sync(false);

    let records: Vec<Graph> = (0..10)
        .map(|i| Graph::parse(&format!("rec {i}\n")).unwrap())
        .collect();
    for r in &records {
        log.append(r).unwrap();
    }
    log.sync().unwrap();

    let mut seen = Vec::new();
    let mut offset = Some(0);
    while let Some(at) = offset {
        let (g, next) = log.read(at).unwrap();
        seen.push(g);
        offset = next;
    }
    assert_eq!(seen, records);
}

#[test]
fn log_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reopen.log");
    let t = Graph::parse("persisted value\n").unwrap();

    let off = {
        let mut log = Log::open(&path).unwrap();
        log.append(&t).unwrap()
    };

    let mut log = Log::open(&path).unwrap();
    let (got, next) = log.read(off).unwrap();
    assert_eq!(got, t);
    assert_eq!(next, None);
}
