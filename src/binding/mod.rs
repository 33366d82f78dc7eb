//! Request binding: decoding request data into typed values.

mod validator;

pub use self::validator::{
    DefaultValidator, NoopValidator, SliceValidationError, StructValidator, Validate,
    ValidationError,
};

use crate::engine::Params;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method, Request};
use serde::de::DeserializeOwned;

pub const MIME_JSON: &str = "application/json";
pub const MIME_XML: &str = "application/xml";
pub const MIME_XML2: &str = "text/xml";
pub const MIME_POST_FORM: &str = "application/x-www-form-urlencoded";
pub const MIME_MULTIPART_POST_FORM: &str = "multipart/form-data";
pub const MIME_PROTOBUF: &str = "application/x-protobuf";
pub const MIME_YAML: &str = "application/x-yaml";
pub const MIME_TOML: &str = "application/toml";

#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("invalid json body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid form data: {0}")]
    Form(#[from] serde_urlencoded::de::Error),

    #[error("unsupported content type: {0:?}")]
    UnsupportedContentType(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A request decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// The request body as JSON.
    Json,
    /// The urlencoded body, or the query string for requests without one.
    Form,
    /// The query string.
    Query,
}

impl Binding {
    pub fn name(self) -> &'static str {
        match self {
            Binding::Json => "json",
            Binding::Form => "form",
            Binding::Query => "query",
        }
    }

    /// Picks the decoder for a request method and content type.
    pub fn default_for(method: &Method, content_type: &str) -> Result<Self, BindError> {
        if method == Method::GET {
            return Ok(Binding::Form);
        }
        match content_type {
            MIME_JSON => Ok(Binding::Json),
            MIME_XML | MIME_XML2 | MIME_PROTOBUF | MIME_YAML | MIME_TOML
            | MIME_MULTIPART_POST_FORM => {
                Err(BindError::UnsupportedContentType(content_type.to_owned()))
            }
            _ => Ok(Binding::Form),
        }
    }

    pub fn bind<T: DeserializeOwned>(self, req: &Request<Bytes>) -> Result<T, BindError> {
        let query = req.uri().query().unwrap_or("");
        match self {
            Binding::Json => Ok(serde_json::from_slice(req.body())?),
            Binding::Query => Ok(serde_urlencoded::from_str(query)?),
            Binding::Form => {
                let has_form_body = req.method() != Method::GET
                    && req.method() != Method::HEAD
                    && content_type(req.headers()) == MIME_POST_FORM;
                if has_form_body {
                    Ok(serde_urlencoded::from_bytes(req.body())?)
                } else {
                    Ok(serde_urlencoded::from_str(query)?)
                }
            }
        }
    }
}

/// Decodes path parameters into a value.
pub fn bind_uri<T: DeserializeOwned>(params: &Params) -> Result<T, BindError> {
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish();
    Ok(serde_urlencoded::from_str(&encoded)?)
}

/// The media type of the `Content-Type` header, without parameters.
pub fn content_type(headers: &HeaderMap) -> &str {
    let value = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    filter_flags(value)
}

fn filter_flags(content: &str) -> &str {
    let end = content.find(|c| c == ';' || c == ' ').unwrap_or(content.len());
    &content[..end]
}
