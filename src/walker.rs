use crate::cache::{CacheStats, SingleFlight};
use crate::content::{ContentFetcher, ContentId};
use crate::error::LookupError;
use crate::key::LookupKey;
use crate::node::Node;
use crate::record::GeoRecord;

use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WalkKey {
    pub node: ContentId,
    pub key: LookupKey,
}

impl fmt::Display for WalkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.key.get())
    }
}

/// Every level of the descent goes through the walk cache, decoded nodes are cached by CID
pub struct TreeWalker<F> {
    fetcher: F,
    walks: SingleFlight<WalkKey, GeoRecord, LookupError>,
    nodes: SingleFlight<ContentId, Arc<Node>, LookupError>,
}

impl<F> TreeWalker<F>
where
    F: ContentFetcher,
{
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            walks: SingleFlight::new(),
            nodes: SingleFlight::new(),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn walk<'a>(
        &'a self,
        node: &'a ContentId,
        key: LookupKey,
    ) -> BoxFuture<'a, Result<GeoRecord, LookupError>> {
        async move {
            let walk_key = WalkKey {
                node: node.clone(),
                key,
            };
            self.walks
                .get_or_compute(walk_key, move || self.descend(node, key))
                .await
        }
        .boxed()
    }

    async fn descend(&self, cid: &ContentId, key: LookupKey) -> Result<GeoRecord, LookupError> {
        let node = self.node(cid).await?;
        match node.as_ref() {
            Node::Internal(internal) => {
                let child = internal
                    .child(key)
                    .ok_or_else(|| LookupError::LookupFailed {
                        cid: cid.clone(),
                        key,
                    })?;
                self.walk(child, key).await
            }
            Node::Leaf(leaf) => {
                let entry = leaf.entry(key).ok_or_else(|| LookupError::LookupFailed {
                    cid: cid.clone(),
                    key,
                })?;
                entry
                    .record
                    .clone()
                    .ok_or_else(|| LookupError::UnmappedRange {
                        cid: cid.clone(),
                        key,
                    })
            }
        }
    }

    /// Fetch and decode a node, or take it from the node cache
    pub async fn node(&self, cid: &ContentId) -> Result<Arc<Node>, LookupError> {
        self.nodes
            .get_or_compute(cid.clone(), move || async move {
                let block = self.fetcher.fetch(cid).await.map_err(|error| {
                    log::warn!("failed to fetch node {cid}: {error}");
                    LookupError::fetch(cid, error)
                })?;
                let node = Node::decode(&block).map_err(|error| {
                    log::warn!("failed to decode node {cid}: {error}");
                    LookupError::decode(cid, error)
                })?;
                log::debug!("fetched {} node {cid}", node.kind());
                Ok(Arc::new(node))
            })
            .await
    }

    pub fn walk_stats(&self) -> CacheStats {
        self.walks.stats()
    }

    pub fn node_stats(&self) -> CacheStats {
        self.nodes.stats()
    }

    pub fn cached_nodes(&self) -> usize {
        self.nodes.len()
    }
}
