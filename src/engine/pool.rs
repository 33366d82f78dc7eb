use super::context::Context;
use crate::binding::StructValidator;

use std::sync::Arc;

use bytes::Bytes;
use http::Request;
use parking_lot::Mutex;

/// Recycled contexts. Every context is reset before it goes back.
#[derive(Default)]
pub(crate) struct ContextPool {
    idle: Mutex<Vec<Box<Context>>>,
}

impl ContextPool {
    pub(crate) fn get(
        &self,
        request: Request<Bytes>,
        validator: &Arc<dyn StructValidator>,
    ) -> Box<Context> {
        match self.idle.lock().pop() {
            Some(mut c) => {
                c.reset(request);
                c
            }
            None => Box::new(Context::with_validator(request, Arc::clone(validator))),
        }
    }

    pub(crate) fn put(&self, mut c: Box<Context>, max_idle: usize) {
        c.reset(Request::default());
        let mut idle = self.idle.lock();
        if idle.len() < max_idle {
            idle.push(c);
        }
    }

    /// Drops every idle context, e.g. after the validator changed.
    pub(crate) fn clear(&self) {
        self.idle.lock().clear();
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.idle.lock().len()
    }
}
