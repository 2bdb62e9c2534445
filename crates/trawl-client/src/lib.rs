//! # trawl-client — The "Net" of TRAWL
//!
//! Client for OpenSearch-compatible search backends. Translates declarative
//! field constraints into query documents and drains unbounded result sets
//! through the scroll pagination protocol, in bounded pages, releasing the
//! server-side cursor no matter how iteration ends.

pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod scroll;
pub mod transport;

pub use client::{ResultSet, ScrollSpec, SearchClient};
pub use config::SearchConfig;
pub use error::{Error, Result};
pub use scroll::{Page, Scroll, ScrollParams};
pub use transport::{HttpTransport, ScrollPage, ScrollTransport};
