use super::error::{Error, ErrorType, Errors};
use super::failure::Failure;
use super::handler::{empty_chain, HandlerFunc, HandlerResult, HandlersChain};
use super::params::Params;
use super::render::{Data, Json, Redirect, Render, Text};
use super::response::{body_allowed_for_status, ResponseWriter};
use crate::binding::{self, BindError, Binding, DefaultValidator, StructValidator, Validate};

use std::any::Any;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::form_urlencoded;

/// Cursor value marking an aborted chain. Far beyond any real chain length,
/// so `next` never finds a handler after it.
pub const ABORT_INDEX: isize = isize::MAX / 2;

/// Where a context is in its handler chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No handler has run yet.
    Created,
    Dispatching,
    /// Every handler ran.
    Completed,
    Aborted,
}

/// Peer address of the connection, set by the transport as a request extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

/// Point in time by which the transport wants the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(pub Instant);

type Value = Arc<dyn Any + Send + Sync>;

/// Per-request state shared by every handler of the chain.
pub struct Context {
    request: Request<Bytes>,
    pub(super) writer: ResponseWriter,
    pub(super) params: Params,
    pub(super) handlers: HandlersChain,
    index: isize,
    pub(super) full_path: String,
    keys: RwLock<HashMap<String, Value>>,
    errors: Errors,
    validator: Arc<dyn StructValidator>,
}

impl Context {
    /// A standalone context, useful to drive a handler chain directly.
    pub fn new(request: Request<Bytes>) -> Self {
        Self::with_validator(request, Arc::new(DefaultValidator))
    }

    pub(crate) fn with_validator(request: Request<Bytes>, validator: Arc<dyn StructValidator>) -> Self {
        Self {
            request,
            writer: ResponseWriter::new(),
            params: Params::default(),
            handlers: empty_chain(),
            index: -1,
            full_path: String::new(),
            keys: RwLock::new(HashMap::new()),
            errors: Errors::default(),
            validator,
        }
    }

    /// Clears every per-request field so the context can serve `request`.
    pub(crate) fn reset(&mut self, request: Request<Bytes>) {
        self.request = request;
        self.writer.reset();
        self.params.clear();
        self.handlers = empty_chain();
        self.index = -1;
        self.full_path.clear();
        self.keys.get_mut().clear();
        self.errors.clear();
    }

    /// Replaces the chain and rewinds the cursor.
    pub fn set_handlers(&mut self, handlers: impl IntoIterator<Item = HandlerFunc>) {
        self.handlers = handlers.into_iter().collect::<Vec<_>>().into();
        self.index = -1;
    }

    /// Moves the buffered response out of the context.
    pub fn take_response(&mut self) -> Response<Bytes> {
        self.writer.take_response()
    }
}

// flow control
impl Context {
    /// Runs the remaining handlers of the chain.
    ///
    /// Meant to be called inside middleware: code before the call runs on
    /// the way in, code after it on the way out. The first failure stops the
    /// chain and is returned to the caller.
    pub fn next(&mut self) -> HandlerResult {
        self.index += 1;
        while let Some(handler) = self.handler_at(self.index) {
            handler.call(self)?;
            self.index += 1;
        }
        Ok(())
    }

    fn handler_at(&self, index: isize) -> Option<HandlerFunc> {
        let index = usize::try_from(index).ok()?;
        self.handlers.get(index).cloned()
    }

    /// Prevents pending handlers from running. Handlers already on the stack
    /// still finish.
    pub fn abort(&mut self) {
        self.index = ABORT_INDEX;
    }

    pub fn is_aborted(&self) -> bool {
        self.index >= ABORT_INDEX
    }

    pub fn state(&self) -> State {
        if self.is_aborted() {
            State::Aborted
        } else if self.index < 0 {
            State::Created
        } else if self.index as usize >= self.handlers.len() {
            State::Completed
        } else {
            State::Dispatching
        }
    }

    pub fn abort_with_status(&mut self, status: StatusCode) {
        self.status(status);
        self.writer.write_header_now();
        self.abort();
    }

    pub fn abort_with_status_json<T>(&mut self, status: StatusCode, obj: &T) -> HandlerResult
    where
        T: Serialize + ?Sized,
    {
        self.abort();
        self.json(status, obj)
    }

    pub fn abort_with_error(
        &mut self,
        status: StatusCode,
        err: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> &mut Error {
        self.abort_with_status(status);
        self.error(err)
    }

    /// Records an error without affecting the flow.
    pub fn error(&mut self, err: impl Into<Box<dyn StdError + Send + Sync>>) -> &mut Error {
        self.errors.push(Error::new(err, ErrorType::PRIVATE))
    }

    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    /// The main handler, the last one of the chain.
    pub fn handler(&self) -> Option<HandlerFunc> {
        self.handlers.last().cloned()
    }

    pub fn handler_name(&self) -> &'static str {
        self.handlers.last().map_or("", |h| h.name())
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// The pattern of the matched route, empty when none matched.
    pub fn full_path(&self) -> &str {
        &self.full_path
    }
}

// keys
impl Context {
    pub fn set(&self, key: impl Into<String>, value: impl Any + Send + Sync) {
        self.keys.write().insert(key.into(), Arc::new(value));
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.keys.read().get(key).cloned()
    }

    pub fn get_as<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.get(key)?.downcast::<T>().ok()
    }

    /// # Panics
    /// Panics if the key does not exist.
    pub fn must_get(&self, key: &str) -> Value {
        match self.get(key) {
            Some(v) => v,
            None => panic!("key {:?} does not exist", key),
        }
    }

    /// A `String` or `&'static str` value, empty otherwise.
    pub fn get_string(&self, key: &str) -> String {
        let value = match self.get(key) {
            Some(v) => v,
            None => return String::new(),
        };
        if let Some(s) = value.downcast_ref::<String>() {
            return s.clone();
        }
        value
            .downcast_ref::<&'static str>()
            .map(|s| (*s).to_owned())
            .unwrap_or_default()
    }

    fn get_copied<T: Any + Send + Sync + Copy + Default>(&self, key: &str) -> T {
        self.get_as::<T>(key).map(|v| *v).unwrap_or_default()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get_copied(key)
    }

    pub fn get_i64(&self, key: &str) -> i64 {
        self.get_copied(key)
    }

    pub fn get_u64(&self, key: &str) -> u64 {
        self.get_copied(key)
    }

    pub fn get_f64(&self, key: &str) -> f64 {
        self.get_copied(key)
    }

    pub fn get_duration(&self, key: &str) -> Duration {
        self.get_copied(key)
    }
}

// input
impl Context {
    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<Bytes> {
        &mut self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    /// The value of a path parameter, empty if the route has no such one.
    pub fn param(&self, key: &str) -> &str {
        self.params.get(key).unwrap_or("")
    }

    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.push(key, value);
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    fn query_pairs(&self) -> form_urlencoded::Parse<'_> {
        form_urlencoded::parse(self.request.uri().query().unwrap_or("").as_bytes())
    }

    /// The first value of a query key.
    pub fn get_query(&self, key: &str) -> Option<String> {
        self.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub fn query(&self, key: &str) -> String {
        self.get_query(key).unwrap_or_default()
    }

    pub fn default_query(&self, key: &str, default: &str) -> String {
        self.get_query(key).unwrap_or_else(|| default.to_owned())
    }

    pub fn query_all(&self, key: &str) -> Vec<String> {
        self.query_pairs()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .collect()
    }

    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.request.headers().get(key)?.to_str().ok()
    }

    pub fn content_type(&self) -> &str {
        binding::content_type(self.request.headers())
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.request.extensions().get::<RemoteAddr>().map(|a| a.0)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.request.extensions().get::<Deadline>().map(|d| d.0)
    }
}

// binding
impl Context {
    pub fn should_bind_with<T>(&self, b: Binding) -> Result<T, BindError>
    where
        T: DeserializeOwned + Validate,
    {
        let value: T = b.bind(&self.request)?;
        self.validator.validate_struct(&value)?;
        Ok(value)
    }

    /// Binds with the decoder chosen by method and content type.
    pub fn should_bind<T: DeserializeOwned + Validate>(&self) -> Result<T, BindError> {
        let b = Binding::default_for(self.method(), self.content_type())?;
        self.should_bind_with(b)
    }

    pub fn should_bind_json<T: DeserializeOwned + Validate>(&self) -> Result<T, BindError> {
        self.should_bind_with(Binding::Json)
    }

    pub fn should_bind_query<T: DeserializeOwned + Validate>(&self) -> Result<T, BindError> {
        self.should_bind_with(Binding::Query)
    }

    pub fn should_bind_form<T: DeserializeOwned + Validate>(&self) -> Result<T, BindError> {
        self.should_bind_with(Binding::Form)
    }

    /// Binds the path parameters.
    pub fn should_bind_uri<T: DeserializeOwned + Validate>(&self) -> Result<T, BindError> {
        let value: T = binding::bind_uri(&self.params)?;
        self.validator.validate_struct(&value)?;
        Ok(value)
    }

    /// Like [`Context::should_bind_with`], but a failure aborts the request
    /// with 400 and is recorded as a [`ErrorType::BIND`] error.
    pub fn bind_with<T>(&mut self, b: Binding) -> Option<T>
    where
        T: DeserializeOwned + Validate,
    {
        let ret = self.should_bind_with(b);
        self.abort_on_bind_error(ret)
    }

    pub fn bind<T: DeserializeOwned + Validate>(&mut self) -> Option<T> {
        let ret = self.should_bind();
        self.abort_on_bind_error(ret)
    }

    pub fn bind_json<T: DeserializeOwned + Validate>(&mut self) -> Option<T> {
        let ret = self.should_bind_json();
        self.abort_on_bind_error(ret)
    }

    fn abort_on_bind_error<T>(&mut self, ret: Result<T, BindError>) -> Option<T> {
        match ret {
            Ok(value) => Some(value),
            Err(e) => {
                self.abort_with_error(StatusCode::BAD_REQUEST, e)
                    .set_type(ErrorType::BIND);
                None
            }
        }
    }
}

// response
impl Context {
    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut ResponseWriter {
        &mut self.writer
    }

    pub fn status(&mut self, status: StatusCode) {
        self.writer.write_header(status);
    }

    /// Sets a response header, or removes it when `value` is empty.
    pub fn header(&mut self, key: &str, value: &str) {
        let name = match HeaderName::from_bytes(key.as_bytes()) {
            Ok(name) => name,
            Err(_) => {
                tracing::warn!(header = key, "invalid header name");
                return;
            }
        };
        if value.is_empty() {
            self.writer.headers_mut().remove(name);
            return;
        }
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.writer.headers_mut().insert(name, value);
            }
            Err(_) => tracing::warn!(header = key, "invalid header value"),
        }
    }

    /// Writes the status and, when the status allows one, the rendered body.
    ///
    /// A render failure is recorded as a [`ErrorType::RENDER`] error and
    /// returned as a [`Failure`].
    pub fn render(&mut self, status: StatusCode, r: impl Render) -> HandlerResult {
        self.status(status);

        if !body_allowed_for_status(status) {
            r.write_content_type(&mut self.writer);
            self.writer.write_header_now();
            return Ok(());
        }

        if let Err(e) = r.render(&mut self.writer) {
            let failure = Failure::internal(e.to_string());
            self.error(e).set_type(ErrorType::RENDER);
            return Err(failure);
        }
        Ok(())
    }

    pub fn string(&mut self, status: StatusCode, text: &str) -> HandlerResult {
        self.render(status, Text(text))
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, obj: &T) -> HandlerResult {
        self.render(status, Json(obj))
    }

    pub fn data(
        &mut self,
        status: StatusCode,
        content_type: &'static str,
        data: impl Into<Bytes>,
    ) -> HandlerResult {
        self.render(
            status,
            Data {
                content_type,
                data: data.into(),
            },
        )
    }

    pub fn redirect(&mut self, status: StatusCode, location: &str) -> HandlerResult {
        self.render(status, Redirect { status, location })
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", self.method())
            .field("path", &self.path())
            .field("full_path", &self.full_path)
            .field("params", &self.params)
            .field("state", &self.state())
            .field("errors", &self.errors.len())
            .finish()
    }
}
