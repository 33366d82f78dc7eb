use super::context::Context;
use super::failure::Failure;

use std::any::type_name;
use std::sync::Arc;

/// What a handler returns: `Ok` to let the chain go on, or a [`Failure`]
/// that unwinds through every enclosing `next` call.
pub type HandlerResult = Result<(), Failure>;

pub trait Handler: Send + Sync + 'static {
    fn call(&self, c: &mut Context) -> HandlerResult;

    /// A diagnostic name, the type name by default.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

impl<F> Handler for F
where
    F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
{
    fn call(&self, c: &mut Context) -> HandlerResult {
        (self)(c)
    }
}

pub type HandlerFunc = Arc<dyn Handler>;

/// An immutable handler chain shared by every request hitting the route.
pub type HandlersChain = Arc<[HandlerFunc]>;

/// Conversion into a shareable handler, used by [`handlers!`](crate::handlers).
pub trait IntoHandler {
    fn into_handler(self) -> HandlerFunc;
}

impl IntoHandler for HandlerFunc {
    fn into_handler(self) -> HandlerFunc {
        self
    }
}

impl<F> IntoHandler for F
where
    F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
{
    fn into_handler(self) -> HandlerFunc {
        Arc::new(self)
    }
}

pub(crate) fn empty_chain() -> HandlersChain {
    Arc::from(Vec::new())
}

pub(crate) fn combine(first: &[HandlerFunc], rest: impl IntoIterator<Item = HandlerFunc>) -> HandlersChain {
    first.iter().cloned().chain(rest).collect::<Vec<_>>().into()
}

/// Builds a `Vec<HandlerFunc>` from functions, closures or existing handlers.
#[macro_export]
macro_rules! handlers {
    () => {
        ::std::vec::Vec::<$crate::HandlerFunc>::new()
    };
    ($($h:expr),+ $(,)?) => {
        ::std::vec![$($crate::IntoHandler::into_handler($h)),+]
    };
}
