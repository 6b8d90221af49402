use crate::cache::CacheStats;
use crate::content::{ContentFetcher, ContentId};
use crate::error::LookupError;
use crate::key::LookupKey;
use crate::record::GeoRecord;
use crate::walker::TreeWalker;

use lazy_static::lazy_static;
use std::net::IpAddr;

/// Root of the GeoLite2-City-CSV_20220628 snapshot
pub const GEOIP_ROOT_CID: &str = "QmQe6m4QRoKk4Q7gxGMkUfanmtC4zgw1cS4nAux75iZqG4";

lazy_static! {
    pub static ref GEOIP_ROOT: ContentId = GEOIP_ROOT_CID.parse().unwrap();
}

pub struct GeoIp<F> {
    root: ContentId,
    walker: TreeWalker<F>,
}

impl<F> GeoIp<F>
where
    F: ContentFetcher,
{
    /// Lookups against the well-known [GEOIP_ROOT] snapshot
    pub fn new(fetcher: F) -> Self {
        Self::with_root(fetcher, GEOIP_ROOT.clone())
    }

    pub fn with_root(fetcher: F, root: ContentId) -> Self {
        Self {
            root,
            walker: TreeWalker::new(fetcher),
        }
    }

    pub fn root(&self) -> &ContentId {
        &self.root
    }

    pub fn walker(&self) -> &TreeWalker<F> {
        &self.walker
    }

    /// Look up "a.b.c.d", "/ip4/a.b.c.d" or an IPv4-mapped IPv6 address
    pub async fn lookup(&self, address: &str) -> Result<GeoRecord, LookupError> {
        let key: LookupKey = address.parse()?;
        self.lookup_key(key).await
    }

    pub async fn lookup_ip(&self, address: IpAddr) -> Result<GeoRecord, LookupError> {
        let key = LookupKey::try_from(address)?;
        self.lookup_key(key).await
    }

    pub async fn lookup_key(&self, key: LookupKey) -> Result<GeoRecord, LookupError> {
        log::debug!("looking up {key} in {}", self.root);
        self.walker.walk(&self.root, key).await
    }

    pub fn stats(&self) -> CacheStats {
        self.walker.walk_stats()
    }
}
