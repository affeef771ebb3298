//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span, echoed back)
//! 4. Security headers (CSP etc.)
//! 5. Cart lock (serializes one visitor's cart writes)
//! 6. Session layer (tower-sessions, in-memory store)
//!
//! The [`VisitorCart`] extractor reads the session the layer attaches.

pub mod cart;
pub mod cart_lock;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use cart::VisitorCart;
pub use cart_lock::{VisitorLocks, cart_lock_middleware};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
