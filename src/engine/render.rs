//! Response renderers.

use super::response::ResponseWriter;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use http::StatusCode;
use serde::Serialize;

pub const MIME_JSON: &str = "application/json; charset=utf-8";
pub const MIME_PLAIN: &str = "text/plain; charset=utf-8";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to encode json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot redirect with status code {0}")]
    RedirectStatus(StatusCode),

    #[error("invalid redirect location: {0:?}")]
    RedirectLocation(String),
}

/// Writes a payload with its content type.
pub trait Render {
    fn content_type(&self) -> Option<&'static str>;

    fn render(&self, w: &mut ResponseWriter) -> Result<(), RenderError>;

    fn write_content_type(&self, w: &mut ResponseWriter) {
        if let Some(ct) = self.content_type() {
            if !w.headers().contains_key(CONTENT_TYPE) {
                w.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(ct));
            }
        }
    }
}

pub struct Json<'a, T: ?Sized>(pub &'a T);

impl<T: Serialize + ?Sized> Render for Json<'_, T> {
    fn content_type(&self) -> Option<&'static str> {
        Some(MIME_JSON)
    }

    fn render(&self, w: &mut ResponseWriter) -> Result<(), RenderError> {
        let body = serde_json::to_vec(self.0)?;
        self.write_content_type(w);
        w.write(&body);
        Ok(())
    }
}

pub struct Text<'a>(pub &'a str);

impl Render for Text<'_> {
    fn content_type(&self) -> Option<&'static str> {
        Some(MIME_PLAIN)
    }

    fn render(&self, w: &mut ResponseWriter) -> Result<(), RenderError> {
        self.write_content_type(w);
        w.write_str(self.0);
        Ok(())
    }
}

pub struct Data {
    pub content_type: &'static str,
    pub data: Bytes,
}

impl Render for Data {
    fn content_type(&self) -> Option<&'static str> {
        Some(self.content_type)
    }

    fn render(&self, w: &mut ResponseWriter) -> Result<(), RenderError> {
        self.write_content_type(w);
        w.write(&self.data);
        Ok(())
    }
}

pub struct Redirect<'a> {
    pub status: StatusCode,
    pub location: &'a str,
}

impl Render for Redirect<'_> {
    fn content_type(&self) -> Option<&'static str> {
        None
    }

    fn render(&self, w: &mut ResponseWriter) -> Result<(), RenderError> {
        let code = self.status.as_u16();
        if !(300..=308).contains(&code) && self.status != StatusCode::CREATED {
            return Err(RenderError::RedirectStatus(self.status));
        }
        let location = HeaderValue::from_str(self.location)
            .map_err(|_| RenderError::RedirectLocation(self.location.to_owned()))?;
        w.headers_mut().insert(LOCATION, location);
        w.write_header(self.status);
        w.write_header_now();
        Ok(())
    }
}
