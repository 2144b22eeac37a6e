//! Authentication and authorization module
//!
//! This module provides JWT-based authentication with the following components:
//! - Token generation and validation
//! - Password hashing with Argon2
//! - Authentication service (registration, login, logout, identity resolution)
//! - Route access policy and the gate middleware that enforces it
//! - Request and response shapes

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod policy;
pub mod service;

pub use jwt::{
    generate_access_token, generate_access_token_at, validate_access_token, Claims, JwtConfig,
    JwtError,
};
pub use middleware::{auth_gate, bearer_token, blacklist_middleware, Principal};
pub use models::{
    ListUsersQuery, LoginRequest, LoginResponse, LogoutRequest, LogoutResponse, PublicUser,
    RegisterRequest, UpdateStatusRequest,
};
pub use password::{
    hash_password, hash_password_with_config, validate_password_policy, verify_password,
    PasswordConfig, PasswordError,
};
pub use policy::{AccessPolicy, RouteAccess, RouteId};
pub use service::{AuthService, Resolution};
