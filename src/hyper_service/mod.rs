#![forbid(unsafe_code)]

mod service;

pub use self::service::{serve, EngineService};

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
type BoxError = Box<dyn StdError + Send + Sync>;
