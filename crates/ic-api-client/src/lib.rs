//! # Image-Credit API Client
//!
//! Outbound adapter for the backend's REST API. A single `HttpBackend`
//! implements all three driven ports:
//!
//! | Port | Endpoints |
//! |------|-----------|
//! | `SessionBackend` | `POST /auth/login`, `POST /auth/signup`, `GET /users/me` |
//! | `TaskBackend` | `GET /tasks`, `GET /tasks/{id}`, `POST /tasks` |
//! | `PaymentBackend` | `POST /payments/create`, `POST /payments/verify` |
//!
//! Status mapping: 401/403 become `Unauthorized`, other 4xx `Rejected`,
//! 5xx and connection failures `Transport`, undecodable bodies `Decode`.

pub mod client;
pub mod config;
pub mod error;

pub use client::HttpBackend;
pub use config::{ClientConfig, ConfigError, DEFAULT_API_URL};
pub use error::{classify, ApiError};
