use bytes::{Bytes, BytesMut};
use http::header::HeaderMap;
use http::{Response, StatusCode};

/// Buffers the status, headers and body a handler chain produces.
///
/// The status becomes final once anything is written: later attempts to
/// change it are ignored with a warning.
#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    size: Option<usize>,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            size: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Bytes of body written so far.
    pub fn size(&self) -> usize {
        self.size.unwrap_or(0)
    }

    /// Whether the status line has been committed.
    pub fn written(&self) -> bool {
        self.size.is_some()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn write_header(&mut self, status: StatusCode) {
        if self.status == status {
            return;
        }
        if self.written() {
            tracing::warn!(
                current = self.status.as_u16(),
                wanted = status.as_u16(),
                "headers were already written"
            );
            return;
        }
        self.status = status;
    }

    /// Commits the status without writing any body.
    pub fn write_header_now(&mut self) {
        if self.size.is_none() {
            self.size = Some(0);
        }
    }

    pub fn write(&mut self, data: &[u8]) -> usize {
        self.write_header_now();
        self.body.extend_from_slice(data);
        self.size = Some(self.size() + data.len());
        data.len()
    }

    pub fn write_str(&mut self, s: &str) -> usize {
        self.write(s.as_bytes())
    }

    pub(crate) fn reset_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub(crate) fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body.clear();
        self.size = None;
    }

    /// Moves the buffered response out, leaving the writer reset.
    pub(crate) fn take_response(&mut self) -> Response<Bytes> {
        let body: Bytes = self.body.split().freeze();
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = std::mem::take(&mut self.headers);
        self.reset();
        response
    }
}

/// Whether a response with this status may carry a body.
pub fn body_allowed_for_status(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}
