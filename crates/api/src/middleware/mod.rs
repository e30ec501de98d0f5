//! HTTP middleware and request extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (`http_request` span)
//! 3. Request ID (recorded into the span, echoed in the response)
//! 4. CORS
//! 5. Security headers
//!
//! Authentication is not a layer: handlers take an [`AuthUser`] argument,
//! which rejects the request with 401 before any handler code runs.

pub mod auth;
pub mod request_id;
pub mod security_headers;

pub use auth::AuthUser;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::security_headers_middleware;
