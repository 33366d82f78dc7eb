use super::context::Context;
use super::handler::{HandlerFunc, HandlerResult};

use std::sync::Arc;
use std::time::Instant;

/// Middleware emitting one `info` event per request.
pub fn logger() -> HandlerFunc {
    Arc::new(log_request)
}

fn log_request(c: &mut Context) -> HandlerResult {
    let start = Instant::now();
    let method = c.method().clone();
    let path = match c.request().uri().query() {
        Some(query) => format!("{}?{}", c.path(), query),
        None => c.path().to_owned(),
    };

    let ret = c.next();

    let latency = start.elapsed();
    let client = c
        .remote_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default();
    let errors = c.errors().messages().join("; ");

    tracing::info!(
        status = c.writer().status().as_u16(),
        ?latency,
        %client,
        %method,
        %path,
        %errors,
        "request"
    );
    ret
}
