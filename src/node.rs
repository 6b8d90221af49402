use crate::content::{Block, ContentId};
use crate::key::LookupKey;
use crate::record::{GeoRecord, Payload};

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Node data is not valid: {0}")]
    Json(#[from] serde_json::Error),
    #[error(r#"Unknown node type "{0}""#)]
    UnknownType(String),
    #[error(r#"{kind} node has no "{field}" field"#)]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}

#[derive(Deserialize)]
struct WireNode {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    mins: Option<Vec<LookupKey>>,
    #[serde(default)]
    data: Option<Vec<WireEntry>>,
}

#[derive(Deserialize)]
struct WireEntry {
    min: LookupKey,
    #[serde(default, deserialize_with = "payload_or_unmapped")]
    data: Option<Payload>,
}

/// `null`, `false`, `0` and `""` mark a range without data
fn payload_or_unmapped<'de, D>(deserializer: D) -> Result<Option<Payload>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let unmapped = match &value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    };
    if unmapped {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Internal(InternalNode),
    Leaf(LeafNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InternalNode {
    mins: Vec<LookupKey>,
    children: Vec<ContentId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode {
    entries: Vec<LeafEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeafEntry {
    pub min: LookupKey,
    pub record: Option<GeoRecord>,
}

/// Index of the last threshold that is `<= key`, thresholds must be ascending
fn position(thresholds: impl IntoIterator<Item = LookupKey>, key: LookupKey) -> Option<usize> {
    thresholds
        .into_iter()
        .take_while(|&min| min <= key)
        .count()
        .checked_sub(1)
}

impl Node {
    pub fn decode(block: &Block) -> Result<Self, DecodeError> {
        let WireNode { kind, mins, data } = serde_json::from_slice(block.data())?;
        match kind.as_str() {
            "Node" => {
                let mins = mins.ok_or(DecodeError::MissingField {
                    kind: "Node",
                    field: "mins",
                })?;
                let children = block.links().iter().map(|link| link.cid.clone()).collect();
                Ok(Self::Internal(InternalNode { mins, children }))
            }
            "Leaf" => {
                let entries = data
                    .ok_or(DecodeError::MissingField {
                        kind: "Leaf",
                        field: "data",
                    })?
                    .into_iter()
                    .map(|entry| LeafEntry {
                        min: entry.min,
                        record: entry.data.map(GeoRecord::from),
                    })
                    .collect();
                Ok(Self::Leaf(LeafNode { entries }))
            }
            _ => Err(DecodeError::UnknownType(kind)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Internal(_) => "internal",
            Self::Leaf(_) => "leaf",
        }
    }
}

impl InternalNode {
    pub fn new(mins: Vec<LookupKey>, children: Vec<ContentId>) -> Self {
        Self { mins, children }
    }

    pub fn mins(&self) -> &[LookupKey] {
        &self.mins
    }

    pub fn children(&self) -> &[ContentId] {
        &self.children
    }

    /// Child covering `key`; `None` if `key` is below the first threshold or the node has fewer
    /// children than thresholds
    pub fn child(&self, key: LookupKey) -> Option<&ContentId> {
        self.children.get(position(self.mins.iter().copied(), key)?)
    }
}

impl LeafNode {
    pub fn new(entries: Vec<LeafEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[LeafEntry] {
        &self.entries
    }

    pub fn entry_index(&self, key: LookupKey) -> Option<usize> {
        position(self.entries.iter().map(|entry| entry.min), key)
    }

    pub fn entry(&self, key: LookupKey) -> Option<&LeafEntry> {
        self.entries.get(self.entry_index(key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Link, MemoryStore};
    use serde_json::json;

    fn cid(name: &str) -> ContentId {
        MemoryStore::cid_of(&Block::new(name.to_owned(), vec![]))
    }

    fn leaf_block(value: serde_json::Value) -> Block {
        Block::new(value.to_string(), vec![])
    }

    fn key(value: u32) -> LookupKey {
        value.into()
    }

    #[test]
    fn decode_internal() {
        let children = vec![cid("a"), cid("b")];
        let block = Block::new(
            r#"{"type":"Node","mins":[0,16777216]}"#,
            children.iter().cloned().map(Link::new).collect(),
        );
        let node = Node::decode(&block).unwrap();
        assert_eq!(
            node,
            Node::Internal(InternalNode::new(vec![key(0), key(16777216)], children))
        );
        assert_eq!(node.kind(), "internal");
    }

    #[test]
    fn decode_leaf() {
        let block = leaf_block(json!({"type": "Leaf", "data": [
            {"min": 0},
            {"min": 10, "data": null},
            {"min": 20, "data": ["Iceland", "IS"]},
            {"min": 30, "data": {"city": "Reykjavik"}},
        ]}));
        let Node::Leaf(leaf) = Node::decode(&block).unwrap() else {
            panic!("expected a leaf");
        };
        let records: Vec<_> = leaf.entries().iter().map(|e| e.record.clone()).collect();
        assert_eq!(records[0], None);
        assert_eq!(records[1], None);
        assert_eq!(
            records[2].as_ref().and_then(|r| r.country_code.as_deref()),
            Some("IS")
        );
        assert_eq!(
            records[3].as_ref().and_then(|r| r.city.as_deref()),
            Some("Reykjavik")
        );
    }

    #[test]
    fn decode_leaf_falsy_payloads() {
        let block = leaf_block(json!({"type": "Leaf", "data": [
            {"min": 0, "data": ""},
            {"min": 10, "data": false},
            {"min": 20, "data": 0},
            {"min": 30, "data": ["Iceland", "IS"]},
        ]}));
        let Node::Leaf(leaf) = Node::decode(&block).unwrap() else {
            panic!("expected a leaf");
        };
        assert_eq!(leaf.entry(key(5)).unwrap().record, None);
        assert_eq!(leaf.entry(key(15)).unwrap().record, None);
        assert_eq!(leaf.entry(key(25)).unwrap().record, None);
        assert!(leaf.entry(key(35)).unwrap().record.is_some());

        let truthy_scalar = leaf_block(json!({"type": "Leaf", "data": [{"min": 0, "data": "Iceland"}]}));
        assert!(matches!(Node::decode(&truthy_scalar), Err(DecodeError::Json(_))));
    }

    #[test]
    fn decode_is_deterministic() {
        let block = leaf_block(json!({"type": "Leaf", "data": [
            {"min": 5, "data": ["Chile", "CL", "RM", "Santiago", "", "-33.45", "-70.66"]},
        ]}));
        assert_eq!(Node::decode(&block).unwrap(), Node::decode(&block).unwrap());
    }

    #[test]
    fn decode_errors() {
        let not_json = Block::new("not json", vec![]);
        assert!(matches!(Node::decode(&not_json), Err(DecodeError::Json(_))));

        let untyped = leaf_block(json!({"mins": [0]}));
        assert!(matches!(Node::decode(&untyped), Err(DecodeError::Json(_))));

        let unknown = leaf_block(json!({"type": "Branch", "mins": [0]}));
        assert!(matches!(
            Node::decode(&unknown),
            Err(DecodeError::UnknownType(kind)) if kind == "Branch"
        ));

        let no_mins = leaf_block(json!({"type": "Node"}));
        assert!(matches!(
            Node::decode(&no_mins),
            Err(DecodeError::MissingField { field: "mins", .. })
        ));

        let no_data = leaf_block(json!({"type": "Leaf", "mins": [0]}));
        assert!(matches!(
            Node::decode(&no_data),
            Err(DecodeError::MissingField { field: "data", .. })
        ));
    }

    #[test]
    fn child_selection_inclusive_lower_bound() {
        let node = InternalNode::new(
            vec![key(100), key(200), key(300)],
            vec![cid("a"), cid("b"), cid("c")],
        );
        assert_eq!(node.child(key(99)), None);
        assert_eq!(node.child(key(100)), Some(&cid("a")));
        assert_eq!(node.child(key(199)), Some(&cid("a")));
        assert_eq!(node.child(key(200)), Some(&cid("b")));
        assert_eq!(node.child(key(300)), Some(&cid("c")));
        assert_eq!(node.child(LookupKey::MAX), Some(&cid("c")));
    }

    #[test]
    fn child_selection_zero_threshold() {
        let node = InternalNode::new(vec![key(0), key(7)], vec![cid("a"), cid("b")]);
        assert_eq!(node.child(LookupKey::MIN), Some(&cid("a")));
    }

    #[test]
    fn child_selection_missing_child() {
        let node = InternalNode::new(vec![key(0), key(7), key(9)], vec![cid("a"), cid("b")]);
        assert_eq!(node.child(key(8)), Some(&cid("b")));
        assert_eq!(node.child(key(9)), None);
    }

    #[test]
    fn entry_index_is_monotonic() {
        let leaf = LeafNode::new(
            [3, 3, 10, 40, 41, 1000]
                .into_iter()
                .map(|min| LeafEntry {
                    min: key(min),
                    record: None,
                })
                .collect(),
        );
        let mut previous = None;
        for k in 3..2000 {
            let index = leaf.entry_index(key(k));
            assert!(index.is_some());
            assert!(index >= previous, "{k}");
            previous = index;
        }
        // equal thresholds: the later one wins
        assert_eq!(leaf.entry_index(key(3)), Some(1));
        assert_eq!(leaf.entry_index(key(2)), None);
    }
}
