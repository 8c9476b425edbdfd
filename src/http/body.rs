//! Request body decoding.

use std::collections::HashMap;

use url::form_urlencoded;

use crate::http::parser::ParseError;
use crate::http::request::Body;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const JSON: &str = "application/json";

/// The closed set of body decoders, selected by media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyDecoder {
    Form,
    Json,
}

impl BodyDecoder {
    /// Picks the decoder for a media type (already stripped of parameters).
    ///
    /// A request without a Content-Type header is treated as form-encoded.
    pub fn for_content_type(content_type: Option<&str>) -> Result<Self, ParseError> {
        match content_type {
            None | Some(FORM_URLENCODED) => Ok(BodyDecoder::Form),
            Some(JSON) => Ok(BodyDecoder::Json),
            Some(other) => Err(ParseError::UnsupportedContentType(other.to_string())),
        }
    }

    pub fn decode(self, raw: &[u8]) -> Result<Body, ParseError> {
        match self {
            BodyDecoder::Form => {
                std::str::from_utf8(raw)
                    .map_err(|e| ParseError::InvalidBody(e.to_string()))?;
                Ok(Body::Form(decode_form(raw)))
            }
            BodyDecoder::Json => serde_json::from_slice(raw)
                .map(Body::Json)
                .map_err(|e| ParseError::InvalidBody(e.to_string())),
        }
    }
}

/// Decodes `a=1&b=2&a=3` into a multi-map, keeping repeated values in order.
pub fn decode_form(input: &[u8]) -> HashMap<String, Vec<String>> {
    let mut params: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in form_urlencoded::parse(input) {
        params
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}
