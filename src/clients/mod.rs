//! Upstream clients (C1, C2). Both are backed by `reqwest` rather than a
//! subprocess fetch tool or a headless browser — what matters downstream is
//! producing the same JSON/HTML shape the parsers expect, not the transport
//! technique used to fetch it.

pub mod fast;
pub mod primary;

pub use fast::FastClient;
pub use primary::PrimaryClient;
