//! Serving files through catch-all routes.

use super::context::Context;
use super::group::RouterGroup;
use super::handler::{HandlerFunc, HandlerResult};
use crate::http_router::Method;
use crate::path::join_paths;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;

/// A read-only tree of files addressed by slash-separated relative paths.
pub trait FileSystem: Send + Sync + 'static {
    fn open(&self, path: &str) -> io::Result<Bytes>;
}

/// Files under a local directory. Paths climbing out with `..` are refused.
#[derive(Debug, Clone)]
pub struct Dir {
    root: PathBuf,
}

impl Dir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let mut full = self.root.clone();
        for part in path.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    return Err(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        "path escapes the served directory",
                    ))
                }
                _ => full.push(part),
            }
        }
        Ok(full)
    }
}

impl FileSystem for Dir {
    fn open(&self, path: &str) -> io::Result<Bytes> {
        let full = self.resolve(path)?;
        if full.is_dir() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "is a directory"));
        }
        std::fs::read(full).map(Bytes::from)
    }
}

/// Media type guessed from the file extension.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "text/xml; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn serve(c: &mut Context, name: &str, file: io::Result<Bytes>) -> HandlerResult {
    match file {
        Ok(data) => c.data(StatusCode::OK, content_type_for(name), data),
        Err(e) if e.kind() == io::ErrorKind::NotFound || e.kind() == io::ErrorKind::PermissionDenied => {
            c.abort_with_status(StatusCode::NOT_FOUND);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn check_static_path(relative_path: &str) {
    if relative_path.contains(':') || relative_path.contains('*') {
        panic!("URL parameters can not be used when serving static files: {}", relative_path);
    }
}

impl RouterGroup<'_> {
    /// Serves a single local file at `relative_path`.
    ///
    /// # Panics
    /// Panics if `relative_path` has parameters.
    pub fn static_file(&mut self, relative_path: &str, file: impl Into<PathBuf>) -> &mut Self {
        check_static_path(relative_path);
        let file: PathBuf = file.into();
        let name = file.to_string_lossy().into_owned();
        let handler: HandlerFunc = Arc::new(move |c: &mut Context| {
            let data = std::fs::read(&file).map(Bytes::from);
            serve(c, &name, data)
        });
        self.handle(Method::GET, relative_path, [handler.clone()]);
        self.handle(Method::HEAD, relative_path, [handler])
    }

    /// Serves every file of `fs` under `relative_path/*filepath`.
    ///
    /// # Panics
    /// Panics if `relative_path` has parameters.
    pub fn static_fs(&mut self, relative_path: &str, fs: impl FileSystem) -> &mut Self {
        check_static_path(relative_path);
        let fs: Arc<dyn FileSystem> = Arc::new(fs);
        let handler: HandlerFunc = Arc::new(move |c: &mut Context| {
            let name = c.param("filepath").to_owned();
            let data = fs.open(&name);
            serve(c, &name, data)
        });
        let pattern = join_paths(relative_path, "/*filepath");
        self.handle(Method::GET, &pattern, [handler.clone()]);
        self.handle(Method::HEAD, &pattern, [handler])
    }

    /// Serves a local directory.
    pub fn static_dir(&mut self, relative_path: &str, root: impl Into<PathBuf>) -> &mut Self {
        self.static_fs(relative_path, Dir::new(root))
    }
}
