//! Security audit logging for authentication events
//!
//! Registrations, logins, logouts, rejected tokens, access denials and
//! account status changes are logged at INFO level on the "audit" target,
//! so they can be filtered and routed separately from application logs.
//! Each record carries the event serialized as JSON.
//!
//! Events never hold passwords, password hashes or bearer tokens.
//!
//! # Example
//!
//! ```ignore
//! use petstore_api::audit::{audit_log, AuditEvent, RequestContext};
//!
//! let ctx = RequestContext::from_headers(&headers);
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: user.id,
//!     email: user.email.clone(),
//!     ip_address: ctx.ip_address,
//!     user_agent: ctx.user_agent,
//! });
//! ```

use axum::http::HeaderMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Security audit events for authentication and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Account created
    RegistrationSuccess {
        user_id: Uuid,
        email: String,
        roles: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Registration rejected (duplicate email, refused role, store failure)
    RegistrationFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Successful login
    LoginSuccess {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login. `reason` is internal only; clients see a generic message.
    LoginFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Token surrendered at logout
    Logout {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
    },

    /// Malformed, forged, expired or unresolvable token
    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },

    /// A token that was invalidated at logout was presented again
    BlacklistedToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Valid token for a deactivated account
    InactiveUser {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
    },

    /// Access denied due to insufficient roles
    AccessDenied {
        user_id: Uuid,
        email: String,
        resource: String,
        required_roles: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Active flag changed by an operator
    AccountStatusChanged {
        user_id: Uuid,
        email: String,
        is_active: bool,
        changed_by: Option<Uuid>,
    },
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::RegistrationSuccess { .. } => "Registration successful",
            AuditEvent::RegistrationFailure { .. } => "Registration failed",
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::Logout { .. } => "User logout",
            AuditEvent::InvalidToken { .. } => "Invalid token",
            AuditEvent::BlacklistedToken { .. } => "Blacklisted token presented",
            AuditEvent::InactiveUser { .. } => "Inactive user rejected",
            AuditEvent::AccessDenied { .. } => "Access denied",
            AuditEvent::AccountStatusChanged { .. } => "Account status changed",
        }
    }
}

/// Client metadata attached to audit events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Log a security audit event with structured fields
///
/// Example output field `event`:
///
/// ```json
/// {
///   "event_type": "login_success",
///   "user_id": "550e8400-e29b-41d4-a716-446655440000",
///   "email": "client@example.com",
///   "ip_address": "192.168.1.1",
///   "user_agent": "Mozilla/5.0..."
/// }
/// ```
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::RegistrationSuccess {
            user_id,
            email,
            roles,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                email = %email,
                roles = %roles,
                ip_address = ?ip_address,
                "{}", event.summary()
            );
        }
        AuditEvent::RegistrationFailure {
            email,
            reason,
            ip_address,
            ..
        }
        | AuditEvent::LoginFailure {
            email,
            reason,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                email = %email,
                reason = %reason,
                ip_address = ?ip_address,
                "{}", event.summary()
            );
        }
        AuditEvent::LoginSuccess {
            user_id,
            email,
            ip_address,
            ..
        }
        | AuditEvent::Logout {
            user_id,
            email,
            ip_address,
        }
        | AuditEvent::InactiveUser {
            user_id,
            email,
            ip_address,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = ?ip_address,
                "{}", event.summary()
            );
        }
        AuditEvent::InvalidToken {
            ip_address, reason, ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                ip_address = ?ip_address,
                reason = %reason,
                "{}", event.summary()
            );
        }
        AuditEvent::BlacklistedToken { ip_address, .. } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                ip_address = ?ip_address,
                "{}", event.summary()
            );
        }
        AuditEvent::AccessDenied {
            user_id,
            email,
            resource,
            required_roles,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                email = %email,
                resource = %resource,
                required_roles = %required_roles,
                ip_address = ?ip_address,
                "{}", event.summary()
            );
        }
        AuditEvent::AccountStatusChanged {
            user_id,
            email,
            is_active,
            changed_by,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                email = %email,
                is_active = %is_active,
                changed_by = ?changed_by,
                "{}", event.summary()
            );
        }
    }
}

/// Extract the client IP from proxy headers
///
/// Checks X-Forwarded-For (first hop) then X-Real-IP.
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(first_ip) = headers
        .get("x-forwarded-for")
        .and_then(|xff| xff.to_str().ok())
        .and_then(|xff| xff.split(',').next())
    {
        return Some(first_ip.trim().to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|ip| ip.to_str().ok())
        .map(|ip| ip.to_string())
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: Uuid::new_v4(),
            email: "client@example.com".to_string(),
            ip_address: Some("192.168.1.1".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"login_success\""));
        assert!(json.contains("client@example.com"));
    }

    #[test]
    fn test_every_variant_logs() {
        let user_id = Uuid::new_v4();
        let events = vec![
            AuditEvent::RegistrationSuccess {
                user_id,
                email: "new@example.com".to_string(),
                roles: "CLIENT".to_string(),
                ip_address: None,
                user_agent: None,
            },
            AuditEvent::RegistrationFailure {
                email: "dup@example.com".to_string(),
                reason: "duplicate email".to_string(),
                ip_address: None,
                user_agent: None,
            },
            AuditEvent::LoginFailure {
                email: "client@example.com".to_string(),
                reason: "password mismatch".to_string(),
                ip_address: Some("10.0.0.1".to_string()),
                user_agent: None,
            },
            AuditEvent::Logout {
                user_id,
                email: "client@example.com".to_string(),
                ip_address: None,
            },
            AuditEvent::BlacklistedToken {
                ip_address: None,
                user_agent: None,
            },
            AuditEvent::InactiveUser {
                user_id,
                email: "off@example.com".to_string(),
                ip_address: None,
            },
            AuditEvent::AccessDenied {
                user_id,
                email: "client@example.com".to_string(),
                resource: "GET /v1/users".to_string(),
                required_roles: "MANAGER".to_string(),
                ip_address: None,
                user_agent: None,
            },
            AuditEvent::AccountStatusChanged {
                user_id,
                email: "client@example.com".to_string(),
                is_active: false,
                changed_by: None,
            },
        ];

        for event in &events {
            audit_log(event);
        }
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_request_context_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::USER_AGENT,
            "Mozilla/5.0 (Test)".parse().unwrap(),
        );

        let ctx = RequestContext::from_headers(&headers);
        assert_eq!(ctx.user_agent.as_deref(), Some("Mozilla/5.0 (Test)"));
        assert_eq!(ctx.ip_address, None);
        assert_eq!(RequestContext::from_headers(&HeaderMap::new()), RequestContext::default());
    }
}
