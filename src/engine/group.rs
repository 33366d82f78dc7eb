use super::handler::{combine, HandlerFunc, HandlersChain};
use crate::http_router::{HttpRouter, Method};
use crate::path::join_paths;
use crate::router::RouterError;

/// Methods [`RouterGroup::any`] registers.
pub const ANY_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::DELETE,
    Method::CONNECT,
    Method::TRACE,
];

/// A path prefix plus the middleware every route under it runs first.
///
/// Groups borrow the engine's route table, so they only exist while routes
/// are being registered.
pub struct RouterGroup<'e> {
    base_path: String,
    handlers: Vec<HandlerFunc>,
    routes: &'e mut HttpRouter<HandlersChain>,
}

impl<'e> RouterGroup<'e> {
    pub(crate) fn new(
        routes: &'e mut HttpRouter<HandlersChain>,
        base_path: String,
        handlers: Vec<HandlerFunc>,
    ) -> Self {
        Self {
            base_path,
            handlers,
            routes,
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Middleware of this group, ancestors' first.
    pub fn handlers(&self) -> &[HandlerFunc] {
        &self.handlers
    }

    /// Adds middleware to routes registered afterwards.
    pub fn use_middleware(&mut self, middleware: impl IntoIterator<Item = HandlerFunc>) -> &mut Self {
        self.handlers.extend(middleware);
        self
    }

    /// A sub-group under `relative_path` running this group's middleware,
    /// then `middleware`.
    pub fn group(
        &mut self,
        relative_path: &str,
        middleware: impl IntoIterator<Item = HandlerFunc>,
    ) -> RouterGroup<'_> {
        let base_path = join_paths(&self.base_path, relative_path);
        let handlers = self.handlers.iter().cloned().chain(middleware).collect();
        RouterGroup::new(&mut *self.routes, base_path, handlers)
    }

    /// Registers routes of a sub-group inside `f`.
    pub fn nest(
        &mut self,
        relative_path: &str,
        middleware: impl IntoIterator<Item = HandlerFunc>,
        f: impl FnOnce(&mut RouterGroup<'_>),
    ) -> &mut Self {
        f(&mut self.group(relative_path, middleware));
        self
    }

    /// Registers a route. On failure nothing is registered.
    pub fn try_handle(
        &mut self,
        method: Method,
        relative_path: &str,
        handlers: impl IntoIterator<Item = HandlerFunc>,
    ) -> Result<&mut Self, RouterError> {
        let path = join_paths(&self.base_path, relative_path);
        let chain = combine(&self.handlers, handlers);
        let last = chain.last().map_or("", |h| h.name());
        let count = chain.len();

        self.routes.try_insert(method.clone(), &path, chain)?;

        tracing::debug!(%method, %path, handlers = count, handler = last, "route registered");
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
        let path = join_paths(&self.base_path, relative_path);
        if let Err(e) = self.try_handle(method.clone(), relative_path, handlers).map(|_| ()) {
            panic!("{} {}: {}", method, path, e);
        }
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

    /// Registers the same chain for every method of [`ANY_METHODS`].
    pub fn any(
        &mut self,
        relative_path: &str,
        handlers: impl IntoIterator<Item = HandlerFunc>,
    ) -> &mut Self {
        self.match_methods(&ANY_METHODS, relative_path, handlers)
    }

    pub fn match_methods(
        &mut self,
        methods: &[Method],
        relative_path: &str,
        handlers: impl IntoIterator<Item = HandlerFunc>,
    ) -> &mut Self {
        let handlers: Vec<HandlerFunc> = handlers.into_iter().collect();
        for method in methods {
            self.handle(method.clone(), relative_path, handlers.iter().cloned());
        }
        self
    }
}
