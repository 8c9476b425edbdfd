use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;

/// HTTP request methods.
///
/// Only the methods on this allow-list are accepted by the parser; any other
/// verb on the request line is rejected as a bad request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Arguments
    ///
    /// * `s` - String representation of the method (case-sensitive, uppercase)
    ///
    /// # Returns
    ///
    /// `Some(Method)` if the string matches a supported method, `None` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// # use sparrow::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("PUT"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// `application/x-www-form-urlencoded`: field name to every value sent for it
    Form(HashMap<String, Vec<String>>),
    /// `application/json`
    Json(serde_json::Value),
}

/// Where the incremental parser currently is for a request.
///
/// Stages only ever move forward: `RequestLine -> Headers -> Body -> Finished`
/// (the body stage is skipped when no content length was sent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseStage {
    #[default]
    RequestLine,
    Headers,
    Body { content_length: usize },
    Finished,
}

/// An HTTP request, filled in piece by piece as bytes arrive.
///
/// A fresh `Request` is empty; [`crate::http::parser::parse_into`] populates the
/// request line fields first, then the headers, then the body. Once
/// [`Request::is_finished`] returns `true` nothing is mutated again.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// The HTTP method, unset until the request line has been parsed
    pub method: Option<Method>,
    /// Percent-decoded path without the query string (e.g., "/welcome/alice")
    pub path: String,
    /// Query string parameters; a name may repeat
    pub query_params: HashMap<String, Vec<String>>,
    /// Request headers keyed by lower-cased name
    pub headers: HashMap<String, String>,
    /// Raw body bytes, present only if a Content-Length was sent
    pub body_raw: Option<Bytes>,
    /// Body decoded according to Content-Type
    pub body: Option<Body>,
    pub(crate) stage: ParseStage,
}

/// Builder for constructing already-parsed Request objects.
///
/// Mostly useful when calling handlers directly, without going through the
/// parser.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    query_params: HashMap<String, Vec<String>>,
    headers: HashMap<String, String>,
    body_raw: Option<Bytes>,
    body: Option<Body>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params
            .entry(key.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Adds a header; the name is stored lower-cased like the parser does.
    pub fn header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn body(mut self, raw: impl Into<Bytes>, body: Option<Body>) -> Self {
        self.body_raw = Some(raw.into());
        self.body = body;
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: Some(self.method.ok_or("method missing")?),
            path: self.path.ok_or("path missing")?,
            query_params: self.query_params,
            headers: self.headers,
            body_raw: self.body_raw,
            body: self.body,
            stage: ParseStage::Finished,
        })
    }
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once no further parsing is required for this request.
    pub fn is_finished(&self) -> bool {
        self.stage == ParseStage::Finished
    }

    pub fn stage(&self) -> ParseStage {
        self.stage
    }

    /// Retrieves a header value by name, ignoring case.
    ///
    /// # Arguments
    ///
    /// * `key` - Header name to look up
    ///
    /// # Returns
    ///
    /// `Some(&str)` with the header value if present, `None` otherwise.
    pub fn header(&self, key: &str) -> Option<&str> {
        if let Some(v) = self.headers.get(key) {
            return Some(v.as_str());
        }
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    /// The raw Content-Length header value, if one was sent.
    pub fn content_length(&self) -> Option<&str> {
        self.header("content-length")
    }

    /// The media type from the Content-Type header, without parameters and
    /// lower-cased (e.g., "application/json" for "Application/JSON; charset=utf-8").
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type").map(|v| {
            v.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// First value of a query parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query_params
            .get(key)
            .and_then(|values| values.first())
            .map(|v| v.as_str())
    }

    /// First value of a field from a form-encoded body.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        match &self.body {
            Some(Body::Form(fields)) => fields
                .get(key)
                .and_then(|values| values.first())
                .map(|v| v.as_str()),
            _ => None,
        }
    }

    /// The decoded JSON body, if the request carried one.
    pub fn json(&self) -> Option<&serde_json::Value> {
        match &self.body {
            Some(Body::Json(value)) => Some(value),
            _ => None,
        }
    }
}
