use crate::content::{ContentId, FetchError};
use crate::key::{AddressError, LookupKey};
use crate::node::DecodeError;

use std::sync::Arc;
use thiserror::Error;

/// Cloneable so that every caller waiting on a shared lookup receives the same error
#[derive(Error, Debug, Clone)]
pub enum LookupError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("Failed to fetch {cid}: {error}")]
    Fetch { cid: ContentId, error: Arc<FetchError> },
    #[error("Failed to decode {cid}: {error}")]
    Decode {
        cid: ContentId,
        error: Arc<DecodeError>,
    },
    #[error("Failed to lookup {key} in node {cid}")]
    LookupFailed { cid: ContentId, key: LookupKey },
    #[error("Unmapped range: leaf {cid} has no data for {key}")]
    UnmappedRange { cid: ContentId, key: LookupKey },
}

impl LookupError {
    pub fn fetch(cid: &ContentId, error: FetchError) -> Self {
        Self::Fetch {
            cid: cid.clone(),
            error: Arc::new(error),
        }
    }

    pub fn decode(cid: &ContentId, error: DecodeError) -> Self {
        Self::Decode {
            cid: cid.clone(),
            error: Arc::new(error),
        }
    }

    pub fn is_unmapped(&self) -> bool {
        matches!(self, Self::UnmappedRange { .. })
    }
}
