//! Request middleware: signature authentication and per-IP rate limiting.

pub mod auth;
pub mod rate_limit;
