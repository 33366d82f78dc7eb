use super::context::Context;
use super::failure::Failure;
use super::handler::{HandlerFunc, HandlerResult};

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Middleware turning failures and panics of the handlers after it into an
/// error response, the status text as a plain body unless something was
/// already written. Register it before everything it should protect.
pub fn recovery() -> HandlerFunc {
    Arc::new(recover)
}

fn recover(c: &mut Context) -> HandlerResult {
    let ret = match panic::catch_unwind(AssertUnwindSafe(|| c.next())) {
        Ok(ret) => ret,
        Err(payload) => Err(Failure::from_panic(payload)),
    };

    if let Err(failure) = ret {
        tracing::error!(
            method = %c.method(),
            path = c.path(),
            status = failure.status().as_u16(),
            error = %failure,
            "recovered from handler failure"
        );
        c.abort();
        if !c.writer().written() {
            let status = failure.status();
            let text = status.canonical_reason().unwrap_or("Internal Server Error");
            return c.string(status, text);
        }
    }
    Ok(())
}
