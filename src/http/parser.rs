//! Incremental HTTP/1.1 request parser.
//!
//! The parser keeps no state of its own: the caller owns a [`Request`] and a
//! byte buffer and calls [`parse_into`] every time new bytes are appended.
//! Each call advances the request through its stages as far as the buffered
//! bytes allow and drains everything it consumed from the front of the buffer.

use std::collections::HashMap;

use bytes::{Buf, BytesMut};
use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::http::body::{BodyDecoder, decode_form};
use crate::http::request::{Method, ParseStage, Request};

pub const CRLF: &[u8] = b"\r\n";
pub const SEPARATOR: &[u8] = b"\r\n\r\n";
pub const HTTP_VERSION: &str = "HTTP/1.1";

pub const MAX_REQUEST_LINE: usize = 8 * 1024;
pub const MAX_HEADER_BYTES: usize = 64 * 1024;
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
    #[error("request line longer than {max} bytes", max = MAX_REQUEST_LINE)]
    RequestLineTooLong,
    #[error("invalid header line: {0:?}")]
    InvalidHeader(String),
    #[error("header block larger than {max} bytes", max = MAX_HEADER_BYTES)]
    HeadersTooLarge,
    #[error("request head is not valid UTF-8")]
    InvalidEncoding,
    #[error("invalid content length: {0:?}")]
    InvalidContentLength(String),
    #[error("declared body of {0} bytes exceeds the {max} byte limit", max = MAX_BODY_BYTES)]
    BodyTooLarge(usize),
    #[error("received {received} body bytes, content length is {expected}")]
    BodyLengthMismatch { expected: usize, received: usize },
    #[error("no body decoder for content type {0:?}")]
    UnsupportedContentType(String),
    #[error("invalid body: {0}")]
    InvalidBody(String),
}

/// Parses as much of `request` as the bytes in `buffer` allow.
///
/// Safe to call repeatedly with the same request while bytes keep arriving at
/// the tail of `buffer`. Stages that already completed are never re-run, and
/// once the request is finished further calls do nothing. Consumed bytes are
/// removed from the front of `buffer`.
///
/// # Errors
///
/// Any [`ParseError`] is terminal for the request.
///
/// # Example
///
/// ```
/// # use bytes::BytesMut;
/// # use sparrow::http::{parser::parse_into, request::Request};
/// let mut request = Request::new();
/// let mut buffer = BytesMut::from(&b"GET /welcome/alice HTTP/1.1\r\nHo"[..]);
///
/// parse_into(&mut request, &mut buffer).unwrap();
/// assert_eq!(request.path, "/welcome/alice");
/// assert!(!request.is_finished());
///
/// buffer.extend_from_slice(b"st: x\r\n\r\n");
/// parse_into(&mut request, &mut buffer).unwrap();
/// assert!(request.is_finished());
/// assert!(buffer.is_empty());
/// ```
pub fn parse_into(request: &mut Request, buffer: &mut BytesMut) -> Result<(), ParseError> {
    loop {
        let advanced = match request.stage {
            ParseStage::RequestLine => parse_request_line(request, buffer)?,
            ParseStage::Headers => parse_headers(request, buffer)?,
            ParseStage::Body { content_length } => parse_body(request, buffer, content_length)?,
            ParseStage::Finished => return Ok(()),
        };

        if !advanced {
            return Ok(());
        }
        tracing::trace!(stage = ?request.stage, remaining = buffer.len(), "parser advanced");
    }
}

/// Returns `Ok(false)` while the request line is still incomplete.
fn parse_request_line(request: &mut Request, buffer: &mut BytesMut) -> Result<bool, ParseError> {
    let Some(line_end) = find(buffer, CRLF) else {
        if buffer.len() > MAX_REQUEST_LINE {
            return Err(ParseError::RequestLineTooLong);
        }
        return Ok(false);
    };
    if line_end > MAX_REQUEST_LINE {
        return Err(ParseError::RequestLineTooLong);
    }

    let line = std::str::from_utf8(&buffer[..line_end]).map_err(|_| ParseError::InvalidEncoding)?;
    let (method, path, query_params) = parse_request_line_str(line)?;

    request.method = Some(method);
    request.path = path;
    request.query_params = query_params;

    // The CRLF stays in the buffer so that the header block always starts
    // with one, even when the request carries no headers at all.
    buffer.advance(line_end);
    request.stage = ParseStage::Headers;
    Ok(true)
}

fn parse_request_line_str(
    line: &str,
) -> Result<(Method, String, HashMap<String, Vec<String>>), ParseError> {
    let malformed = || ParseError::MalformedRequestLine(line.to_string());

    let mut parts = line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };

    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(malformed());
    }
    if !target.starts_with('/') || !version.eq_ignore_ascii_case(HTTP_VERSION) {
        return Err(malformed());
    }

    let method_name = method.to_ascii_uppercase();
    let method =
        Method::from_str(&method_name).ok_or(ParseError::UnsupportedMethod(method_name))?;

    let (path, query_params) = split_target(target)?;
    Ok((method, path, query_params))
}

/// Splits a request target into its percent-decoded path and query parameters.
fn split_target(target: &str) -> Result<(String, HashMap<String, Vec<String>>), ParseError> {
    let target = target.split('#').next().unwrap_or_default();
    let (raw_path, raw_query) = match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    };

    let path = percent_decode_str(raw_path)
        .decode_utf8()
        .map_err(|_| ParseError::InvalidEncoding)?
        .into_owned();

    Ok((path, decode_form(raw_query.as_bytes())))
}

/// Returns `Ok(false)` until the blank line ending the header block arrives.
fn parse_headers(request: &mut Request, buffer: &mut BytesMut) -> Result<bool, ParseError> {
    let Some(block_end) = find(buffer, SEPARATOR) else {
        if buffer.len() > MAX_HEADER_BYTES {
            return Err(ParseError::HeadersTooLarge);
        }
        return Ok(false);
    };
    if block_end > MAX_HEADER_BYTES {
        return Err(ParseError::HeadersTooLarge);
    }

    let block = std::str::from_utf8(&buffer[..block_end]).map_err(|_| ParseError::InvalidEncoding)?;
    let headers = parse_header_block(block)?;

    let next_stage = match headers.get("content-length") {
        Some(raw) => ParseStage::Body {
            content_length: parse_content_length(raw)?,
        },
        None => ParseStage::Finished,
    };

    request.headers = headers;
    buffer.advance(block_end + SEPARATOR.len());
    request.stage = next_stage;

    if next_stage == ParseStage::Finished {
        buffer.clear();
    }
    Ok(true)
}

fn parse_header_block(block: &str) -> Result<HashMap<String, String>, ParseError> {
    let mut headers = HashMap::new();

    for line in block.split("\r\n").filter(|line| !line.is_empty()) {
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ParseError::InvalidHeader(line.to_string()));
        }

        // Duplicates collapse: the last one wins.
        headers.insert(key.to_ascii_lowercase(), value.trim().to_string());
    }

    Ok(headers)
}

fn parse_content_length(raw: &str) -> Result<usize, ParseError> {
    let invalid = || ParseError::InvalidContentLength(raw.to_string());

    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let length = raw.parse::<usize>().map_err(|_| invalid())?;

    if length > MAX_BODY_BYTES {
        return Err(ParseError::BodyTooLarge(length));
    }
    Ok(length)
}

/// Returns `Ok(false)` until exactly `content_length` body bytes are buffered.
fn parse_body(
    request: &mut Request,
    buffer: &mut BytesMut,
    content_length: usize,
) -> Result<bool, ParseError> {
    if buffer.len() > content_length {
        return Err(ParseError::BodyLengthMismatch {
            expected: content_length,
            received: buffer.len(),
        });
    }
    if buffer.len() < content_length {
        return Ok(false);
    }

    let raw = buffer.split().freeze();
    let body = if raw.is_empty() {
        None
    } else {
        let decoder = BodyDecoder::for_content_type(request.content_type().as_deref())?;
        Some(decoder.decode(&raw)?)
    };

    request.body_raw = Some(raw);
    request.body = body;
    request.stage = ParseStage::Finished;
    Ok(true)
}

fn find(buf: &[u8], needle: &[u8]) -> Option<usize> {
    buf.windows(needle.len()).position(|w| w == needle)
}
