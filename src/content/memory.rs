use super::{Block, ContentFetcher, ContentId, FetchError, Link, RAW_CODEC, SHA2_256};

use async_trait::async_trait;
use cid::Cid;
use multihash::Multihash;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// CIDs are SHA2-256 over the block data followed by its link CIDs
#[derive(Debug, Default)]
pub struct MemoryStore {
    blocks: RwLock<HashMap<ContentId, Block>>,
    fetches: AtomicUsize,
    latency: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps for `latency` before answering, like a remote store would
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn cid_of(block: &Block) -> ContentId {
        let mut hasher = Sha256::new();
        hasher.update(block.data());
        for link in block.links() {
            hasher.update(link.cid.as_cid().to_bytes());
        }
        let digest = hasher.finalize();
        let multihash = Multihash::<64>::wrap(SHA2_256, &digest)
            .expect("SHA2-256 digest always fits into a 64-byte multihash");
        Cid::new_v1(RAW_CODEC, multihash).into()
    }

    pub fn insert(&self, block: Block) -> ContentId {
        let cid = Self::cid_of(&block);
        self.blocks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(cid.clone())
            .or_insert(block);
        cid
    }

    /// Store a JSON document as block data, linking to `children` in order
    pub fn insert_json(&self, value: &serde_json::Value, children: &[ContentId]) -> ContentId {
        let links = children.iter().cloned().map(Link::new).collect();
        self.insert(Block::new(value.to_string(), links))
    }

    pub fn contains(&self, cid: &ContentId) -> bool {
        self.blocks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(cid)
    }

    pub fn len(&self) -> usize {
        self.blocks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ContentFetcher for MemoryStore {
    async fn fetch(&self, cid: &ContentId) -> Result<Block, FetchError> {
        self.fetches.fetch_add(1, Ordering::AcqRel);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.blocks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(cid)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(cid.clone()))
    }
}
