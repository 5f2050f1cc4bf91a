//! Pass-through filters applied around route dispatch.

pub mod sanitize;
pub mod security;
pub mod static_files;

pub use sanitize::{sanitize, MAX_BODY_BYTES};
pub use security::{with_security_headers, SECURITY_HEADERS};
pub use static_files::serve_static;
