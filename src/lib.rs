//! A radix-tree HTTP router with onion-style middleware dispatch.
//!
//! + [`Router`]: the prefix tree of one method, generic over its data.
//! + [`HttpRouter`]: one tree per method.
//! + [`Engine`]: route groups, handler chains and the per-request [`Context`].
//! + `hyper_service`: serves an engine over hyper (feature `hyper-service`).

#![deny(unsafe_code)]

pub mod binding;
pub mod engine;
pub mod http_router;
pub mod path;
pub mod router;

#[cfg(feature = "hyper-service")]
pub mod hyper_service;

pub use crate::engine::{
    Context, Engine, EngineConfig, Failure, Handler, HandlerFunc, HandlerResult, HandlersChain,
    IntoHandler, Params, RouterGroup, State,
};
pub use crate::http_router::{HttpRouter, Method};
pub use crate::router::{Captures, Match, Router, RouterError};

pub use http::StatusCode;
