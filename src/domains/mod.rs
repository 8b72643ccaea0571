//! Domains module containing business logic organized by bounded contexts.
//!
//! The server exposes a single domain today: tools, the named capabilities
//! clients can discover and call.

pub mod tools;
