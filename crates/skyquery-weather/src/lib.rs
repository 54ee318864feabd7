//! Weather queries for SkyQuery
//!
//! Builds YQL-style queries for a location, fetches them through a
//! pluggable transport, and keeps the results in a TTL-bound cache.

pub mod branding;
pub mod conditions;
pub mod query;
pub mod retry;
pub mod service;
pub mod transport;

pub use branding::{augment, DARK_LOGO, DARK_LOGO_KEY, LIGHT_LOGO, LIGHT_LOGO_KEY};
pub use conditions::{condition_text, translate_condition_code};
pub use query::{location_search_query, scoped_query, Scope, Units};
pub use retry::RetryConfig;
pub use service::{parse_envelope, QueryService};
pub use transport::{Transport, TransportConfig, TransportError, YqlTransport};

pub use skyquery_cache::Payload;
pub use skyquery_core::{ResponseError, WeatherError};
