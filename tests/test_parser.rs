use bytes::BytesMut;
use sparrow::http::parser::{MAX_BODY_BYTES, MAX_HEADER_BYTES, ParseError, parse_into};
use sparrow::http::request::{Body, Method, ParseStage, Request};

fn parse_all(raw: &[u8]) -> (Request, BytesMut) {
    let mut request = Request::new();
    let mut buffer = BytesMut::from(raw);
    parse_into(&mut request, &mut buffer).unwrap();
    (request, buffer)
}

fn parse_byte_by_byte(raw: &[u8]) -> Request {
    let mut request = Request::new();
    let mut buffer = BytesMut::new();
    for byte in raw {
        buffer.extend_from_slice(&[*byte]);
        parse_into(&mut request, &mut buffer).unwrap();
    }
    request
}

fn assert_same_request(a: &Request, b: &Request) {
    assert_eq!(a.method, b.method);
    assert_eq!(a.path, b.path);
    assert_eq!(a.query_params, b.query_params);
    assert_eq!(a.headers, b.headers);
    assert_eq!(a.body_raw, b.body_raw);
    assert_eq!(a.body, b.body);
    assert_eq!(a.is_finished(), b.is_finished());
}

#[test]
fn test_parse_simple_get_request() {
    let (parsed, remaining) = parse_all(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n");

    assert_eq!(parsed.method, Some(Method::GET));
    assert_eq!(parsed.path, "/");
    assert_eq!(parsed.header("Host"), Some("example.com"));
    assert!(parsed.is_finished());
    assert!(remaining.is_empty());
}

#[test]
fn test_parse_welcome_scenario() {
    let (parsed, _) = parse_all(b"GET /welcome/alice HTTP/1.1\r\nHost: x\r\n\r\n");

    assert_eq!(parsed.method, Some(Method::GET));
    assert_eq!(parsed.path, "/welcome/alice");
    assert!(parsed.is_finished());
}

#[test]
fn test_split_points_do_not_change_result() {
    let requests: [&[u8]; 4] = [
        b"GET /search?q=rust&q=tokio HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\n",
        b"POST /login HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 27\r\n\r\nname=alice&password=secret1",
        b"POST /api HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 17\r\n\r\n{\"a\":[1,2],\"b\":0}",
        b"GET / HTTP/1.1\r\n\r\n",
    ];

    for raw in requests {
        let (whole, _) = parse_all(raw);
        let incremental = parse_byte_by_byte(raw);
        assert!(whole.is_finished());
        assert_same_request(&whole, &incremental);

        for split in 1..raw.len() {
            let mut request = Request::new();
            let mut buffer = BytesMut::from(&raw[..split]);
            parse_into(&mut request, &mut buffer).unwrap();
            buffer.extend_from_slice(&raw[split..]);
            parse_into(&mut request, &mut buffer).unwrap();
            assert_same_request(&whole, &request);
        }
    }
}

#[test]
fn test_parse_query_params_are_decoded() {
    let (parsed, _) = parse_all(b"GET /search?q=hello+world&tag=a&tag=b%26c HTTP/1.1\r\n\r\n");

    assert_eq!(parsed.path, "/search");
    assert_eq!(parsed.query_params["q"], vec!["hello world"]);
    assert_eq!(parsed.query_params["tag"], vec!["a", "b&c"]);
    assert_eq!(parsed.query("tag"), Some("a"));
}

#[test]
fn test_parse_path_is_percent_decoded() {
    let (parsed, _) = parse_all(b"GET /files/my%20file HTTP/1.1\r\n\r\n");

    assert_eq!(parsed.path, "/files/my file");
}

#[test]
fn test_parse_method_is_case_insensitive() {
    let (parsed, _) = parse_all(b"post /x http/1.1\r\nContent-Length: 0\r\n\r\n");

    assert_eq!(parsed.method, Some(Method::POST));
}

#[test]
fn test_parse_unsupported_method() {
    for raw in [
        &b"PUT / HTTP/1.1\r\n\r\n"[..],
        b"DELETE /x HTTP/1.1\r\n",
        b"INVALID / HTTP/1.1\r\n\r\n",
    ] {
        let mut request = Request::new();
        let result = parse_into(&mut request, &mut BytesMut::from(raw));
        assert!(matches!(result, Err(ParseError::UnsupportedMethod(_))), "{result:?}");
    }
}

#[test]
fn test_parse_malformed_request_line() {
    for raw in [
        &b"GET\r\n\r\n"[..],
        b"GET / HTTP/1.0\r\n\r\n",
        b"GET /a b HTTP/1.1\r\n\r\n",
        b"GET noslash HTTP/1.1\r\n\r\n",
        b"G3T / HTTP/1.1\r\n\r\n",
    ] {
        let mut request = Request::new();
        let result = parse_into(&mut request, &mut BytesMut::from(raw));
        assert!(matches!(result, Err(ParseError::MalformedRequestLine(_))), "{result:?}");
    }
}

#[test]
fn test_parse_incomplete_request_missing_blank_line() {
    let (parsed, remaining) = parse_all(b"GET / HTTP/1.1\r\nHost: example.com\r\n");

    assert_eq!(parsed.method, Some(Method::GET));
    assert_eq!(parsed.stage(), ParseStage::Headers);
    assert!(parsed.headers.is_empty());
    assert_eq!(&remaining[..], b"\r\nHost: example.com\r\n");
}

#[test]
fn test_parse_malformed_header() {
    let mut request = Request::new();
    let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\nBrokenHeader\r\n\r\n"[..]);

    let result = parse_into(&mut request, &mut buffer);

    assert!(matches!(result, Err(ParseError::InvalidHeader(_))));
}

#[test]
fn test_parse_headers_are_lowercased_and_last_wins() {
    let (parsed, _) = parse_all(b"GET / HTTP/1.1\r\nX-Tag: one\r\nx-tag:   two  \r\nHost: a:80\r\n\r\n");

    assert_eq!(parsed.headers.len(), 2);
    assert_eq!(parsed.headers["x-tag"], "two");
    assert_eq!(parsed.header("X-TAG"), Some("two"));
    assert_eq!(parsed.header("host"), Some("a:80"));
}

#[test]
fn test_parse_content_length_zero_finishes_immediately() {
    let (parsed, remaining) = parse_all(b"POST /api HTTP/1.1\r\nContent-Length: 0\r\n\r\n");

    assert!(parsed.is_finished());
    assert_eq!(parsed.body_raw.as_deref(), Some(&b""[..]));
    assert_eq!(parsed.body, None);
    assert!(remaining.is_empty());
}

#[test]
fn test_parse_body_waits_for_exact_length() {
    let mut request = Request::new();
    let mut buffer =
        BytesMut::from(&b"POST /login HTTP/1.1\r\nContent-Length: 10\r\n\r\nname=b"[..]);

    parse_into(&mut request, &mut buffer).unwrap();
    assert!(!request.is_finished());
    assert_eq!(request.stage(), ParseStage::Body { content_length: 10 });
    assert_eq!(request.body_raw, None);

    buffer.extend_from_slice(b"ob&x");
    parse_into(&mut request, &mut buffer).unwrap();

    assert!(request.is_finished());
    assert!(buffer.is_empty());
    assert_eq!(request.form_value("name"), Some("bob"));
}

#[test]
fn test_parse_body_longer_than_content_length_never_finishes() {
    let mut request = Request::new();
    let mut buffer = BytesMut::from(&b"POST /api HTTP/1.1\r\nContent-Length: 3\r\n\r\nhello"[..]);

    let result = parse_into(&mut request, &mut buffer);

    assert_eq!(
        result,
        Err(ParseError::BodyLengthMismatch {
            expected: 3,
            received: 5
        })
    );
    assert!(!request.is_finished());
}

#[test]
fn test_parse_form_body_defaults_without_content_type() {
    let (parsed, _) = parse_all(b"POST /login HTTP/1.1\r\nContent-Length: 19\r\n\r\nname=a&name=b&pw=c1");

    match parsed.body {
        Some(Body::Form(fields)) => {
            assert_eq!(fields["name"], vec!["a", "b"]);
            assert_eq!(fields["pw"], vec!["c1"]);
        }
        other => panic!("expected form body, got {other:?}"),
    }
}

#[test]
fn test_parse_json_body() {
    let (parsed, _) = parse_all(
        b"POST /api HTTP/1.1\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: 13\r\n\r\n{\"id\": [1,2]}",
    );

    assert_eq!(parsed.json(), Some(&serde_json::json!({"id": [1, 2]})));
    assert_eq!(parsed.body_raw.as_deref(), Some(&b"{\"id\": [1,2]}"[..]));
}

#[test]
fn test_parse_unsupported_content_type() {
    let mut request = Request::new();
    let mut buffer =
        BytesMut::from(&b"POST /upload HTTP/1.1\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nhi"[..]);

    let result = parse_into(&mut request, &mut buffer);

    assert!(matches!(result, Err(ParseError::UnsupportedContentType(t)) if t == "text/plain"));
}

#[test]
fn test_parse_invalid_content_length() {
    let mut request = Request::new();
    let mut buffer = BytesMut::from(&b"POST /api HTTP/1.1\r\nContent-Length: ten\r\n\r\n"[..]);

    let result = parse_into(&mut request, &mut buffer);

    assert!(matches!(result, Err(ParseError::InvalidContentLength(_))));
}

#[test]
fn test_parse_oversized_body_is_rejected_up_front() {
    let raw = format!("POST /api HTTP/1.1\r\nContent-Length: {}\r\n\r\n", MAX_BODY_BYTES + 1);
    let mut request = Request::new();
    let mut buffer = BytesMut::from(raw.as_bytes());

    let result = parse_into(&mut request, &mut buffer);

    assert_eq!(result, Err(ParseError::BodyTooLarge(MAX_BODY_BYTES + 1)));
}

#[test]
fn test_parse_oversized_header_block_is_rejected() {
    let mut raw = b"GET / HTTP/1.1\r\n".to_vec();
    raw.extend(std::iter::repeat_n(b'a', MAX_HEADER_BYTES + 1));
    let mut request = Request::new();
    let mut buffer = BytesMut::from(raw.as_slice());

    let result = parse_into(&mut request, &mut buffer);

    assert_eq!(result, Err(ParseError::HeadersTooLarge));
}

#[test]
fn test_parse_path_decoding_to_invalid_utf8() {
    let mut request = Request::new();
    let mut buffer = BytesMut::from(&b"GET /%FF HTTP/1.1\r\n\r\n"[..]);

    let result = parse_into(&mut request, &mut buffer);

    assert_eq!(result, Err(ParseError::InvalidEncoding));
}

#[test]
fn test_parse_raw_invalid_utf8_in_request_line() {
    let mut request = Request::new();
    let mut buffer = BytesMut::from(&b"GET /\xFF HTTP/1.1\r\n\r\n"[..]);

    let result = parse_into(&mut request, &mut buffer);

    assert_eq!(result, Err(ParseError::InvalidEncoding));
}

#[test]
fn test_finished_request_is_not_touched_again() {
    let (mut parsed, _) = parse_all(b"GET /done HTTP/1.1\r\n\r\n");
    let mut buffer = BytesMut::from(&b"POST /other HTTP/1.1\r\n\r\n"[..]);

    parse_into(&mut parsed, &mut buffer).unwrap();

    assert_eq!(parsed.method, Some(Method::GET));
    assert_eq!(parsed.path, "/done");
    assert_eq!(buffer.len(), 24);
}
