//! The dispatcher: route registration, request dispatch and the per-request
//! [`Context`].

macro_rules! define_method {
    ($($name:ident => $method:ident),+ $(,)?) => {
        $(
            pub fn $name(
                &mut self,
                relative_path: &str,
                handlers: impl IntoIterator<Item = HandlerFunc>,
            ) -> &mut Self {
                self.handle(Method::$method, relative_path, handlers)
            }
        )+
    };
}

mod config;
mod context;
mod error;
mod failure;
mod group;
mod handler;
mod logger;
mod params;
mod pool;
mod recovery;
mod render;
mod response;
mod static_files;

pub use self::config::EngineConfig;
pub use self::context::{Context, Deadline, RemoteAddr, State, ABORT_INDEX};
pub use self::error::{Error, ErrorType, Errors};
pub use self::failure::Failure;
pub use self::group::{RouterGroup, ANY_METHODS};
pub use self::handler::{Handler, HandlerFunc, HandlerResult, HandlersChain, IntoHandler};
pub use self::logger::logger;
pub use self::params::Params;
pub use self::recovery::recovery;
pub use self::render::{Data, Json, Redirect, Render, RenderError, Text, MIME_JSON, MIME_PLAIN};
pub use self::response::{body_allowed_for_status, ResponseWriter};
pub use self::static_files::{content_type_for, Dir, FileSystem};

use self::handler::{combine, empty_chain};
use self::pool::ContextPool;
use crate::binding::{DefaultValidator, StructValidator};
use crate::http_router::{HttpRouter, Method};
use crate::path::{clean_path, join_paths};
use crate::router::{Match, RouterError};

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use once_cell::sync::Lazy;
use regex::Regex;

static SAFE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9/-]+").unwrap());
static REPEATED_SLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"/{2,}").unwrap());

const DEFAULT_404_BODY: &str = "404 page not found";
const DEFAULT_405_BODY: &str = "405 method not allowed";

/// A registered route, as reported by [`Engine::routes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: Method,
    pub path: String,
    /// Name of the last handler of the chain.
    pub handler: &'static str,
}

/// Route table, fallback chains and dispatch policy.
///
/// Routes are registered through `&mut self` before serving starts. Dispatch
/// only needs `&self`, so a finished engine can be shared across threads.
pub struct Engine {
    middleware: Vec<HandlerFunc>,
    trees: HttpRouter<HandlersChain>,
    no_route: Vec<HandlerFunc>,
    no_method: Vec<HandlerFunc>,
    all_no_route: HandlersChain,
    all_no_method: HandlersChain,
    config: EngineConfig,
    validator: Arc<dyn StructValidator>,
    pool: ContextPool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine without any middleware.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            middleware: Vec::new(),
            trees: HttpRouter::new(),
            no_route: Vec::new(),
            no_method: Vec::new(),
            all_no_route: empty_chain(),
            all_no_method: empty_chain(),
            config,
            validator: Arc::new(DefaultValidator),
            pool: ContextPool::default(),
        }
    }

    /// An engine running [`logger`] and [`recovery`] on every request.
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.use_middleware([logger(), recovery()]);
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    /// Replaces the validator applied by the context binding methods.
    pub fn set_validator(&mut self, validator: impl StructValidator + 'static) -> &mut Self {
        self.validator = Arc::new(validator);
        self.pool.clear();
        self
    }

    /// Adds global middleware. It runs for routes registered afterwards and
    /// for the 404 and 405 chains.
    pub fn use_middleware(&mut self, middleware: impl IntoIterator<Item = HandlerFunc>) -> &mut Self {
        self.middleware.extend(middleware);
        self.rebuild_fallbacks();
        self
    }

    /// Handlers run when no route matches.
    pub fn no_route(&mut self, handlers: impl IntoIterator<Item = HandlerFunc>) -> &mut Self {
        self.no_route = handlers.into_iter().collect();
        self.rebuild_fallbacks();
        self
    }

    /// Handlers run when the path only matches under other methods.
    pub fn no_method(&mut self, handlers: impl IntoIterator<Item = HandlerFunc>) -> &mut Self {
        self.no_method = handlers.into_iter().collect();
        self.rebuild_fallbacks();
        self
    }

    fn rebuild_fallbacks(&mut self) {
        self.all_no_route = combine(&self.middleware, self.no_route.iter().cloned());
        self.all_no_method = combine(&self.middleware, self.no_method.iter().cloned());
    }

    fn root(&mut self) -> RouterGroup<'_> {
        RouterGroup::new(&mut self.trees, String::from("/"), self.middleware.clone())
    }

    /// A route group under `relative_path`, running the global middleware
    /// and then `middleware`.
    pub fn group(
        &mut self,
        relative_path: &str,
        middleware: impl IntoIterator<Item = HandlerFunc>,
    ) -> RouterGroup<'_> {
        let base_path = join_paths("/", relative_path);
        let handlers = self.middleware.iter().cloned().chain(middleware).collect();
        RouterGroup::new(&mut self.trees, base_path, handlers)
    }

    pub fn nest(
        &mut self,
        relative_path: &str,
        middleware: impl IntoIterator<Item = HandlerFunc>,
        f: impl FnOnce(&mut RouterGroup<'_>),
    ) -> &mut Self {
        f(&mut self.group(relative_path, middleware));
        self
    }

    pub fn try_handle(
        &mut self,
        method: Method,
        relative_path: &str,
        handlers: impl IntoIterator<Item = HandlerFunc>,
    ) -> Result<&mut Self, RouterError> {
        self.root().try_handle(method, relative_path, handlers)?;
        Ok(self)
    }

    /// # Panics
    /// Panics if the path is malformed or conflicts with a registered route.
    pub fn handle(
        &mut self,
        method: Method,
        relative_path: &str,
        handlers: impl IntoIterator<Item = HandlerFunc>,
    ) -> &mut Self {
        self.root().handle(method, relative_path, handlers);
        self
    }

    define_method! {
        get => GET,
        post => POST,
        put => PUT,
        delete => DELETE,
        patch => PATCH,
        head => HEAD,
        options => OPTIONS,
    }

    pub fn any(
        &mut self,
        relative_path: &str,
        handlers: impl IntoIterator<Item = HandlerFunc>,
    ) -> &mut Self {
        self.root().any(relative_path, handlers);
        self
    }

    pub fn match_methods(
        &mut self,
        methods: &[Method],
        relative_path: &str,
        handlers: impl IntoIterator<Item = HandlerFunc>,
    ) -> &mut Self {
        self.root().match_methods(methods, relative_path, handlers);
        self
    }

    pub fn static_file(&mut self, relative_path: &str, file: impl Into<PathBuf>) -> &mut Self {
        self.root().static_file(relative_path, file);
        self
    }

    pub fn static_fs(&mut self, relative_path: &str, fs: impl FileSystem) -> &mut Self {
        self.root().static_fs(relative_path, fs);
        self
    }

    pub fn static_dir(&mut self, relative_path: &str, root: impl Into<PathBuf>) -> &mut Self {
        self.root().static_dir(relative_path, root);
        self
    }

    /// Every registered route, grouped by method in registration order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.trees
            .routes()
            .map(|(method, path, chain)| RouteInfo {
                method: method.clone(),
                path: path.to_owned(),
                handler: chain.last().map_or("", |h| h.name()),
            })
            .collect()
    }

    pub fn router(&self) -> &HttpRouter<HandlersChain> {
        &self.trees
    }
}

// dispatch
impl Engine {
    /// Runs the request through its handler chain and returns the buffered
    /// response.
    ///
    /// A failure that no recovery middleware caught is returned as is.
    pub fn dispatch(&self, request: Request<Bytes>) -> Result<Response<Bytes>, Failure> {
        let mut c = self.pool.get(request, &self.validator);

        let ret = self.handle_http_request(&mut c);

        if !c.errors().is_empty() {
            tracing::warn!(
                method = %c.method(),
                path = c.path(),
                errors = %c.errors(),
                "request finished with errors"
            );
        }

        let ret = ret.map(|()| c.take_response());
        self.pool.put(c, self.config.max_idle_contexts);
        ret
    }

    fn handle_http_request(&self, c: &mut Context) -> HandlerResult {
        let method = c.method().clone();
        let path = if self.config.remove_extra_slash {
            clean_path(c.path())
        } else {
            c.path().to_owned()
        };

        let mut tsr = false;
        match self.trees.lookup(&method, &path) {
            Match::Found {
                data,
                captures,
                full_path,
            } => {
                c.handlers = Arc::clone(data);
                c.full_path.push_str(full_path);
                for &(name, value) in captures.iter() {
                    c.params.push(name, self.param_value(value));
                }
                return c.next();
            }
            Match::TrailingSlashRedirect => tsr = true,
            Match::NotFound => {}
        }

        if method != Method::CONNECT && path != "/" {
            if tsr && self.config.redirect_trailing_slash {
                return redirect_trailing_slash(c, &path);
            }
            if self.config.redirect_fixed_path {
                if let Some(fixed) = self.fixed_path(&method, c.path()) {
                    return redirect_request(c, &fixed);
                }
            }
        }

        if self.config.handle_method_not_allowed {
            let allowed = self.trees.allowed_methods(&path, &method);
            if !allowed.is_empty() {
                let allow = allowed
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                c.header(ALLOW.as_str(), &allow);
                c.handlers = Arc::clone(&self.all_no_method);
                return serve_error(c, StatusCode::METHOD_NOT_ALLOWED, DEFAULT_405_BODY);
            }
        }

        c.handlers = Arc::clone(&self.all_no_route);
        serve_error(c, StatusCode::NOT_FOUND, DEFAULT_404_BODY)
    }

    fn param_value(&self, raw: &str) -> String {
        if !self.config.unescape_path_values {
            return raw.to_owned();
        }
        urlencoding::decode(raw)
            .map(Cow::into_owned)
            .unwrap_or_else(|_| raw.to_owned())
    }

    fn fixed_path(&self, method: &Method, path: &str) -> Option<String> {
        let router = self.trees.router(method)?;
        router.find_case_insensitive_path(&clean_path(path), self.config.redirect_trailing_slash)
    }
}

/// Runs the fallback chain with `status` preset, and writes the default body
/// only if the chain wrote nothing and kept the status.
fn serve_error(c: &mut Context, status: StatusCode, default_body: &str) -> HandlerResult {
    c.writer.reset_status(status);
    c.next()?;
    if c.writer.written() {
        return Ok(());
    }
    if c.writer.status() == status {
        c.writer
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(MIME_PLAIN));
        c.writer.write_str(default_body);
        return Ok(());
    }
    c.writer.write_header_now();
    Ok(())
}

/// Redirects `path`, the path the lookup ran on, to its trailing-slash
/// alternative.
fn redirect_trailing_slash(c: &mut Context, path: &str) -> HandlerResult {
    let mut p = path.to_owned();
    if let Some(prefix) = c.get_header("X-Forwarded-Prefix") {
        let prefix = clean_path(prefix);
        let prefix = SAFE_PREFIX.replace_all(&prefix, "");
        let prefix = REPEATED_SLASH.replace_all(&prefix, "/");
        p = format!("{}{}", prefix.trim_end_matches('/'), p);
    }

    let target = match p.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped.to_owned(),
        _ => format!("{}/", p),
    };
    // a leading "//" would make the location protocol-relative
    let target = format!("/{}", target.trim_start_matches('/'));
    redirect_request(c, &target)
}

/// Redirects to `path`, keeping the query: 301 for GET, 307 otherwise.
fn redirect_request(c: &mut Context, path: &str) -> HandlerResult {
    let status = if c.method() == Method::GET {
        StatusCode::MOVED_PERMANENTLY
    } else {
        StatusCode::TEMPORARY_REDIRECT
    };
    let location = match c.request().uri().query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_owned(),
    };
    tracing::debug!(from = c.path(), to = %location, status = status.as_u16(), "redirecting request");
    c.redirect(status, &location)
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("routes", &self.trees.len())
            .field("middleware", &self.middleware.len())
            .field("config", &self.config)
            .finish()
    }
}
