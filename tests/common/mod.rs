#![allow(dead_code)]

use ipfs_geoip::{ContentId, GeoRecord, MemoryStore};
use serde_json::json;

pub const ASHBURN_IP: &str = "66.6.44.4";

/// A small three-level dataset:
///
/// ```text
/// root [1.0.0.0, 66.0.0.0]
/// ├── oceania leaf [1.0.0.0 -> Australia]
/// └── node [66.0.0.0, 127.0.0.0]
///     ├── americas leaf [66.0.0.0 -> unmapped, 66.6.44.0 -> Ashburn]
///     └── loopback leaf [127.0.0.0 -> unmapped]
/// ```
pub struct Dataset {
    pub store: MemoryStore,
    pub root: ContentId,
    pub node: ContentId,
    pub oceania: ContentId,
    pub americas: ContentId,
    pub loopback: ContentId,
}

impl Dataset {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        let oceania = store.insert_json(&oceania_leaf(), &[]);
        let americas = store.insert_json(&americas_leaf(), &[]);
        let loopback = store.insert_json(&loopback_leaf(), &[]);
        let node = store.insert_json(
            &json!({"type": "Node", "mins": [1107296256u32, 2130706432u32]}),
            &[americas.clone(), loopback.clone()],
        );
        let root = store.insert_json(
            &json!({"type": "Node", "mins": [16777216u32, 1107296256u32]}),
            &[oceania.clone(), node.clone()],
        );
        Self {
            store,
            root,
            node,
            oceania,
            americas,
            loopback,
        }
    }
}

pub fn oceania_leaf() -> serde_json::Value {
    json!({"type": "Leaf", "data": [
        {"min": 16777216u32, "data": ["Australia", "AU", "", "", "", "-33.494", "143.2104", "", ""]},
    ]})
}

pub fn americas_leaf() -> serde_json::Value {
    json!({"type": "Leaf", "data": [
        {"min": 1107296256u32},
        {"min": 1107700736u32, "data": ["USA", "US", "VA", "Ashburn", "20103", "39.0019", "-77.4556", "", ""]},
    ]})
}

pub fn loopback_leaf() -> serde_json::Value {
    json!({"type": "Leaf", "data": [{"min": 2130706432u32, "data": null}]})
}

pub fn ashburn() -> GeoRecord {
    GeoRecord {
        country_name: Some("USA".into()),
        country_code: Some("US".into()),
        region_code: Some("VA".into()),
        city: Some("Ashburn".into()),
        postal_code: Some("20103".into()),
        latitude: Some(39.0019),
        longitude: Some(-77.4556),
        planet: Some("Earth".into()),
        ..Default::default()
    }
}
