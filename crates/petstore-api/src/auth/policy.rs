//! Per-route access policy
//!
//! Role requirements are plain data: a table from `(method, path template)`
//! to [`RouteAccess`], consulted by the gate on every request.

use axum::http::Method;
use petstore_core::{Role, RoleSet};
use std::collections::HashMap;

/// A route as the router matched it, e.g. `PATCH /v1/users/:id/status`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteId {
    pub method: Method,
    pub path: String,
}

impl RouteId {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

/// Who may call a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAccess {
    /// No credential needed
    Public,
    /// Any resolved principal
    Authenticated,
    /// A principal holding at least one of these roles
    Roles(RoleSet),
}

impl RouteAccess {
    /// Role gate: does a principal holding `roles` satisfy this requirement?
    pub fn permits(&self, roles: &RoleSet) -> bool {
        match self {
            RouteAccess::Public | RouteAccess::Authenticated => true,
            RouteAccess::Roles(required) => required.intersects(roles),
        }
    }
}

/// Route access table
///
/// Routes that were never declared require authentication.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    routes: HashMap<RouteId, RouteAccess>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn public(self, method: Method, path: &str) -> Self {
        self.declare(method, path, RouteAccess::Public)
    }

    pub fn authenticated(self, method: Method, path: &str) -> Self {
        self.declare(method, path, RouteAccess::Authenticated)
    }

    /// Require at least one of `roles`
    pub fn require_any(self, method: Method, path: &str, roles: &[Role]) -> Self {
        let access = match RoleSet::new(roles.iter().copied()) {
            Ok(set) => RouteAccess::Roles(set),
            Err(_) => RouteAccess::Authenticated,
        };
        self.declare(method, path, access)
    }

    pub fn declare(mut self, method: Method, path: &str, access: RouteAccess) -> Self {
        self.routes.insert(RouteId::new(method, path), access);
        self
    }

    pub fn lookup(&self, method: &Method, path: &str) -> &RouteAccess {
        self.routes
            .get(&RouteId::new(method.clone(), path))
            .unwrap_or(&RouteAccess::Authenticated)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
