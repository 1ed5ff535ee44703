//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Handlers build a [`Response`] and return it — or return anything that
//! implements [`IntoResponse`]: a `serde_json::Value` becomes a JSON body, a
//! plain string becomes an HTML body, a bare [`Status`] becomes an empty
//! response.

use crate::status::Status;

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use trellis::{Response, Status};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::html("<h1>hi</h1>");
/// Response::empty(Status::NoContent);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use trellis::{Response, Status};
///
/// Response::builder()
///     .status(Status::Created)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
pub struct Response {
    pub(crate) body: Vec<u8>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: u16,
}

impl Response {
    /// `200 OK` — `application/json`.
    ///
    /// Pass bytes from your serialiser directly:
    /// `serde_json::to_vec(&val).unwrap()` or hand-built
    /// `format!(r#"{{"id":{id}}}"#).into_bytes()`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::bytes_raw("application/json", body)
    }

    /// `200 OK` — `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::bytes_raw("text/html; charset=utf-8", body.into().into_bytes())
    }

    /// `200 OK` — `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::bytes_raw("text/plain; charset=utf-8", body.into().into_bytes())
    }

    /// Response with no body and no headers.
    pub fn empty(code: Status) -> Self {
        Self { body: Vec::new(), headers: Vec::new(), status: code.into() }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: Status::Ok.into() }
    }

    fn bytes_raw(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            body,
            headers: vec![("content-type".to_owned(), content_type.to_owned())],
            status: Status::Ok.into(),
        }
    }

    pub fn status_code(&self) -> u16 { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the response with its status replaced.
    pub fn with_status(mut self, code: Status) -> Self {
        self.status = code.into();
        self
    }

    /// Returns the response with a header appended.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Returns the response with its body replaced. Any existing
    /// `content-type` header is kept.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Returns the response with the body dropped, along with the
    /// `content-length` and `content-type` headers. Status and all other
    /// headers are preserved. This is the HEAD transformation.
    pub fn without_body(mut self) -> Self {
        self.body = Vec::new();
        self.headers.retain(|(k, _)| {
            !k.eq_ignore_ascii_case("content-length") && !k.eq_ignore_ascii_case("content-type")
        });
        self
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `Status::Ok` (200).
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: u16,
}

impl ResponseBuilder {
    pub fn status(mut self, code: Status) -> Self {
        self.status = code.into();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: Vec<u8>) -> Response {
        self.finish("application/json", body)
    }

    /// Terminate with an HTML body (`text/html; charset=utf-8`).
    pub fn html(self, body: impl Into<String>) -> Response {
        self.finish("text/html; charset=utf-8", body.into().into_bytes())
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", body.into().into_bytes())
    }

    /// Terminate with no body (e.g. `Status::NoContent`).
    pub fn no_body(self) -> Response {
        Response { body: Vec::new(), headers: self.headers, status: self.status }
    }

    fn finish(self, content_type: &str, body: Vec<u8>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers. The
/// provided impls cover the handler-return shapes the router accepts: a
/// response is forwarded as-is, an associative `serde_json::Value` is
/// serialized as JSON, a plain string becomes an HTML body, and a bare
/// [`Status`] becomes an empty response.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::html(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::html(self) }
}

impl IntoResponse for serde_json::Value {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self) {
            Ok(bytes) => Response::json(bytes),
            Err(_) => Response::empty(Status::InternalServerError),
        }
    }
}

/// Return a [`Status`] directly from a handler: `return Status::NotFound`.
impl IntoResponse for Status {
    fn into_response(self) -> Response { Response::empty(self) }
}
