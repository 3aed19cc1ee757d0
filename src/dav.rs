//! Seam to the WebDAV method implementation and the permission each method needs.

use crate::user::{Permission, User};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use std::fmt::Debug;
use url::Url;

pub const ALLOW_METHODS: &str =
    "OPTIONS, GET, HEAD, POST, PUT, DELETE, PROPFIND, PROPPATCH, MKCOL, COPY, MOVE, LOCK, UNLOCK";

/// Executes an authorized WebDAV request against the user's home directory.
#[async_trait]
pub trait ProtocolDispatcher: Send + Sync + Debug {
    /// Whether `path` already exists for `user`. Decides if a `PUT` creates or updates.
    async fn exists(&self, _user: &User, _path: &str) -> bool {
        false
    }

    /// `path` is normalized and relative to the mount prefix.
    async fn dispatch(&self, user: &User, path: &str, request: Request<Body>) -> Response;
}

/// Placeholder used when no backend is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableDispatcher;

#[async_trait]
impl ProtocolDispatcher for UnavailableDispatcher {
    async fn dispatch(&self, _user: &User, _path: &str, _request: Request<Body>) -> Response {
        (StatusCode::NOT_IMPLEMENTED, "no WebDAV backend configured").into_response()
    }
}

/// Permissions a request needs on its own path and, for `COPY`/`MOVE`, on the
/// `Destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub source: Permission,
    pub destination: Option<Permission>,
}

impl Requirement {
    const fn on_path(source: Permission) -> Self {
        Self {
            source,
            destination: None,
        }
    }
}

/// `None` for methods the protected surface does not serve.
#[must_use]
pub fn requirement(method: &Method, exists: bool) -> Option<Requirement> {
    let requirement = match method.as_str() {
        "OPTIONS" | "GET" | "HEAD" | "PROPFIND" => Requirement::on_path(Permission::Read),
        "PUT" if exists => Requirement::on_path(Permission::Update),
        "PUT" | "MKCOL" => Requirement::on_path(Permission::Create),
        "PROPPATCH" | "LOCK" | "UNLOCK" | "POST" => Requirement::on_path(Permission::Update),
        "DELETE" => Requirement::on_path(Permission::Delete),
        "COPY" => Requirement {
            source: Permission::Read,
            destination: Some(Permission::Create),
        },
        "MOVE" => Requirement {
            source: Permission::Delete,
            destination: Some(Permission::Create),
        },
        _ => return None,
    };
    Some(requirement)
}

/// Percent-decode and resolve `.`/`..` segments. `..` never climbs above the root.
/// Returns `None` when the decoded path is not UTF-8 or contains a NUL byte.
#[must_use]
pub fn normalize_path(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    if decoded.contains('\0') {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut normalized = format!("/{}", segments.join("/"));
    if decoded.ends_with('/') && !segments.is_empty() {
        normalized.push('/');
    }
    Some(normalized)
}

/// Mount prefix with a leading and trailing `/`.
#[must_use]
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

/// Normalize a request path and make it relative to the mount `prefix`. `None` when the
/// path cannot be decoded or lies outside the mount.
#[must_use]
pub fn relative_path(raw: &str, prefix: &str) -> Option<String> {
    let path = normalize_path(raw)?;
    let prefix = normalize_prefix(prefix);
    if prefix == "/" {
        return Some(path);
    }

    let mount = prefix.trim_end_matches('/');
    if path == mount {
        return Some("/".to_string());
    }
    path.strip_prefix(mount)
        .filter(|rest| rest.starts_with('/'))
        .map(str::to_string)
}

/// Resolve a `Destination` header (absolute URL or absolute path) to a path relative
/// to `prefix`. `None` when it points outside the mount.
#[must_use]
pub fn destination_path(header: &str, prefix: &str) -> Option<String> {
    let header = header.trim();
    if header.starts_with('/') {
        relative_path(header, prefix)
    } else {
        relative_path(Url::parse(header).ok()?.path(), prefix)
    }
}
