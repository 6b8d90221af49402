pub mod dag_pb;
pub mod gateway;
pub mod kubo;
pub mod memory;

pub use dag_pb::DagPbError;
pub use gateway::{GatewayFetcher, IpfsFetcher};
pub use kubo::KuboFetcher;
pub use memory::MemoryStore;

use async_trait::async_trait;
use cid::Cid;
use hyper::body::Bytes;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Multihash code
pub(crate) const SHA2_256: u64 = 0x12;

/// Multicodecs
pub(crate) const RAW_CODEC: u64 = 0x55;
pub(crate) const DAG_PB_CODEC: u64 = 0x70;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(Cid);

impl ContentId {
    pub fn as_cid(&self) -> &Cid {
        &self.0
    }
}

impl From<Cid> for ContentId {
    fn from(cid: Cid) -> Self {
        Self(cid)
    }
}

impl FromStr for ContentId {
    type Err = cid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Cid::try_from(s.trim())?))
    }
}

impl TryFrom<String> for ContentId {
    type Error = cid::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub cid: ContentId,
    pub name: String,
    pub size: u64,
}

impl Link {
    pub fn new(cid: ContentId) -> Self {
        Self {
            cid,
            name: String::new(),
            size: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    data: Bytes,
    links: Vec<Link>,
}

impl Block {
    pub fn new(data: impl Into<Bytes>, links: Vec<Link>) -> Self {
        Self {
            data: data.into(),
            links,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Hyper(#[from] hyper::Error),
    #[error(transparent)]
    Http(#[from] hyper::http::Error),
    #[error("Non-success status code {status}: {message}")]
    NonSuccess { status: StatusCode, message: String },
    #[error("No response within {0:?}")]
    Timeout(Duration),
    #[error("Malformed content store response: {0}")]
    Response(#[from] serde_json::Error),
    #[error("Malformed block data: {0}")]
    Data(#[from] base64::DecodeError),
    #[error("Malformed block link: {0}")]
    Link(#[from] cid::Error),
    #[error("Block {0} is not available")]
    NotFound(ContentId),
    #[error("Malformed dag-pb block: {0}")]
    DagPb(#[from] DagPbError),
    #[error("Unsupported CID codec 0x{0:x}")]
    Codec(u64),
    #[error("Block does not match its identifier {0}")]
    Digest(ContentId),
}

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, cid: &ContentId) -> Result<Block, FetchError>;
}

#[async_trait]
impl<T> ContentFetcher for &T
where
    T: ContentFetcher + ?Sized,
{
    async fn fetch(&self, cid: &ContentId) -> Result<Block, FetchError> {
        (**self).fetch(cid).await
    }
}

#[async_trait]
impl<T> ContentFetcher for Arc<T>
where
    T: ContentFetcher + ?Sized,
{
    async fn fetch(&self, cid: &ContentId) -> Result<Block, FetchError> {
        (**self).fetch(cid).await
    }
}
