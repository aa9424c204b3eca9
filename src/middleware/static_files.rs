//! Serve files from a directory under a URL prefix.

use super::{ConfiguredMiddleware, MiddlewareContext};
use http::Method;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, info};

/// A URL prefix mapped onto a directory.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    prefix: String,
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(prefix: &str, base: P) -> Self {
        let prefix = match prefix.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed => trimmed.to_string(),
        };
        Self {
            prefix,
            base_dir: base.into(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The part of `path` below the prefix, or `None` if `path` is not
    /// under it.
    fn strip_prefix<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.prefix == "/" {
            return Some(path);
        }
        let rest = path.strip_prefix(self.prefix.as_str())?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }

    /// Resolve a path relative to the prefix, refusing anything that would
    /// escape the base directory.
    fn map_path(&self, relative: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(relative.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "html" | "htm" => "text/html",
            "css" => "text/css",
            "js" => "application/javascript",
            "json" => "application/json",
            "txt" => "text/plain",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "ico" => "image/x-icon",
            _ => "application/octet-stream",
        }
    }

    /// Read the file for a request path.
    ///
    /// # Errors
    ///
    /// `NotFound` when the path is outside the prefix, escapes the base
    /// directory, or does not name a regular file. Other I/O errors pass
    /// through.
    pub fn load(&self, url_path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let not_found = |msg: &'static str| io::Error::new(io::ErrorKind::NotFound, msg);
        let relative = self
            .strip_prefix(url_path)
            .ok_or_else(|| not_found("outside prefix"))?;
        let path = self
            .map_path(relative)
            .ok_or_else(|| not_found("invalid path"))?;
        if !path.is_file() {
            return Err(not_found("file not found"));
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, Self::content_type(&path)))
    }
}

pub type StaticMiddleware = ConfiguredMiddleware<StaticFiles>;

/// Serve `GET`/`HEAD` requests under `prefix` from `directory`. Requests
/// that do not resolve to a file continue down the chain.
pub fn static_middleware<P: Into<PathBuf>>(prefix: &str, directory: P) -> StaticMiddleware {
    let files = StaticFiles::new(prefix, directory);
    info!(
        prefix = %files.prefix(),
        directory = %files.base_dir().display(),
        "Static mount registered"
    );
    ConfiguredMiddleware::new("static", files, serve_static)
}

fn serve_static(ctx: &mut MiddlewareContext<'_>, files: &StaticFiles) -> anyhow::Result<()> {
    let request = ctx.request();
    let head = request.method == Method::HEAD;
    if request.method != Method::GET && !head {
        return ctx.next();
    }

    match files.load(&request.path) {
        Ok((bytes, content_type)) => {
            debug!(path = %request.path, bytes = bytes.len(), "Serving static file");
            let sink = ctx.sink();
            sink.set_header("Content-Type", content_type);
            sink.write_status(200);
            if !head {
                sink.write_body(&bytes);
            }
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => ctx.next(),
        Err(err) => {
            error!(path = %request.path, error = %err, "Failed to read static file");
            ctx.sink().write_status(500);
            Ok(())
        }
    }
}
