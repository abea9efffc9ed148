//! Property tests: parsing must not depend on how input is chunked.

use std::sync::Arc;

use burrow_core::proptest::{RequestHead, request_head, split_points};
use burrow_core::{HttpVersion, Method, ParseLimits};
use burrow_http::{
    ConnectionId, NotFound, ParseStatus, Request, SocketHandle, decode_in_place, percent_decode,
    split_query,
};
use proptest::prelude::*;

#[derive(Debug, PartialEq, Eq)]
struct Snapshot {
    method: Option<Method>,
    version: HttpVersion,
    path: Option<String>,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
}

fn new_request() -> Request {
    Request::new(
        ConnectionId::new(1),
        SocketHandle::new(1),
        Arc::new(NotFound),
        ParseLimits::default(),
    )
}

fn snapshot(req: &mut Request) -> Snapshot {
    req.ensure_query_parsed();
    Snapshot {
        method: req.method(),
        version: req.version(),
        path: req.path().map(str::to_string),
        query: req
            .query()
            .map(|q| q.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
            .unwrap_or_default(),
        headers: req
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

fn expected(head: &RequestHead) -> Snapshot {
    Snapshot {
        method: Some(head.method),
        version: head.version,
        path: Some(head.path.clone()),
        query: head.query.clone(),
        headers: head.headers.clone(),
    }
}

/// Feeds `wire` cut at `points`, asserting a single dispatch on the last byte.
fn feed_chunked(wire: &[u8], points: &[usize]) -> Request {
    let mut req = new_request();
    let mut start = 0;
    let mut dispatches = 0;

    for end in points.iter().copied().chain(std::iter::once(wire.len())) {
        let chunk = &wire[start..end];
        start = end;
        if req.is_dispatched() {
            assert!(chunk.is_empty(), "bytes left after dispatch");
            continue;
        }
        match req.feed(chunk).unwrap() {
            ParseStatus::Incomplete => {}
            ParseStatus::Dispatched { consumed, .. } => {
                assert_eq!(consumed, chunk.len());
                dispatches += 1;
            }
        }
    }

    assert_eq!(dispatches, 1);
    req
}

proptest! {
    #[test]
    fn chunking_does_not_change_result(
        (head, points) in request_head().prop_flat_map(|head| {
            let len = head.to_wire().len();
            (Just(head), split_points(len))
        })
    ) {
        let wire = head.to_wire();

        let mut whole = feed_chunked(&wire, &[]);
        let mut chunked = feed_chunked(&wire, &points);

        let whole = snapshot(&mut whole);
        prop_assert_eq!(&whole, &expected(&head));
        prop_assert_eq!(snapshot(&mut chunked), whole);
    }

    #[test]
    fn byte_at_a_time_matches(head in request_head()) {
        let wire = head.to_wire();
        let points: Vec<usize> = (1..wire.len()).collect();
        let mut req = feed_chunked(&wire, &points);
        prop_assert_eq!(snapshot(&mut req), expected(&head));
    }

    #[test]
    fn lf_only_matches_crlf(head in request_head()) {
        let crlf = head.to_wire();
        let lf: Vec<u8> = crlf.iter().copied().filter(|&b| b != b'\r').collect();

        let mut a = feed_chunked(&crlf, &[]);
        let mut b = feed_chunked(&lf, &[]);
        prop_assert_eq!(snapshot(&mut a), snapshot(&mut b));
    }

    #[test]
    fn decode_is_identity_without_escapes(s in "[^%+]{0,64}") {
        let mut buf = s.as_bytes().to_vec();
        decode_in_place(&mut buf);
        prop_assert_eq!(&buf, s.as_bytes());
        prop_assert_eq!(&*percent_decode(&s), s.as_str());
    }

    #[test]
    fn decode_never_grows(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        let mut buf = bytes.clone();
        decode_in_place(&mut buf);
        prop_assert!(buf.len() <= bytes.len());
    }

    #[test]
    fn split_query_keeps_every_pair(head in request_head()) {
        let (path, query) = split_query(&head.url(), &ParseLimits::default());
        prop_assert_eq!(path, head.path.clone());
        let pairs: Vec<(String, String)> =
            query.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        prop_assert_eq!(pairs, head.query);
    }

    #[test]
    fn arbitrary_bytes_never_panic(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..8)
    ) {
        let mut req = new_request();
        for chunk in &chunks {
            if req.feed(chunk).is_err() || req.is_dispatched() {
                break;
            }
        }
        req.ensure_query_parsed();
        let _ = req.path();
    }
}
