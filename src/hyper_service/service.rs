use super::{BoxError, BoxFuture};
use crate::engine::{Engine, RemoteAddr};

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, ToSocketAddrs};

/// Adapts an [`Engine`] to a hyper service.
///
/// The request body is buffered before dispatch. A failure no recovery
/// middleware caught becomes the service error, so hyper drops the
/// connection.
#[derive(Debug, Clone)]
pub struct EngineService {
    engine: Arc<Engine>,
    remote_addr: Option<SocketAddr>,
}

impl EngineService {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            remote_addr: None,
        }
    }

    /// Peer address handed to handlers through [`RemoteAddr`].
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }
}

impl<B> Service<Request<B>> for EngineService
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = Response<Full<Bytes>>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let engine = Arc::clone(&self.engine);
        Box::pin(dispatch(engine, self.remote_addr, req))
    }
}

async fn dispatch<B>(
    engine: Arc<Engine>,
    remote_addr: Option<SocketAddr>,
    req: Request<B>,
) -> Result<Response<Full<Bytes>>, BoxError>
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    let (mut parts, body) = req.into_parts();
    let body = body
        .collect()
        .await
        .map_err(Into::<BoxError>::into)?
        .to_bytes();

    if let Some(addr) = remote_addr {
        parts.extensions.insert(RemoteAddr(addr));
    }

    let response = engine.dispatch(Request::from_parts(parts, body))?;
    Ok(response.map(Full::new))
}

/// Serves HTTP/1.1 connections accepted on `listener`, one task each.
pub async fn serve(listener: TcpListener, engine: Arc<Engine>) -> io::Result<()> {
    loop {
        let (stream, remote_addr) = listener.accept().await?;
        let service = EngineService::new(Arc::clone(&engine)).with_remote_addr(remote_addr);

        tokio::spawn(async move {
            let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
            if let Err(err) = conn.await {
                tracing::debug!(%remote_addr, error = %err, "connection error");
            }
        });
    }
}

impl Engine {
    /// Binds `addr` and serves until accepting fails.
    pub async fn run(self, addr: impl ToSocketAddrs) -> io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        serve(listener, Arc::new(self)).await
    }
}
