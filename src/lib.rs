pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod geoip;
pub mod header_tools;
pub mod key;
pub mod node;
pub mod record;
pub mod service;
mod uri_tools;
pub mod walker;

pub use content::{
    ContentFetcher, ContentId, GatewayFetcher, IpfsFetcher, KuboFetcher, MemoryStore,
};
pub use error::LookupError;
pub use geoip::{GeoIp, GEOIP_ROOT};
pub use key::LookupKey;
pub use record::GeoRecord;
