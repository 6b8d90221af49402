use super::{Block, ContentId, Link};

use cid::Cid;
use thiserror::Error;

const DATA: u64 = 1;
const LINKS: u64 = 2;

const LINK_HASH: u64 = 1;
const LINK_NAME: u64 = 2;
const LINK_TSIZE: u64 = 3;

const WIRE_VARINT: u64 = 0;
const WIRE_LEN: u64 = 2;

#[derive(Error, Debug)]
pub enum DagPbError {
    #[error("Unexpected end of dag-pb data")]
    UnexpectedEof,
    #[error("Varint does not fit into 64 bits")]
    VarintOverflow,
    #[error("Field {field} has unsupported wire type {wire_type}")]
    WireType { field: u64, wire_type: u64 },
    #[error("Unexpected field {0}")]
    UnexpectedField(u64),
    #[error("Link has no hash")]
    MissingHash,
    #[error("Link hash is not a CID: {0}")]
    Hash(#[from] cid::Error),
    #[error("Link name is not UTF-8: {0}")]
    Name(#[from] std::string::FromUtf8Error),
}

enum Field<'a> {
    Varint(u64),
    Bytes(&'a [u8]),
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn varint(&mut self) -> Result<u64, DagPbError> {
        let mut result: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let byte = *self.buf.get(self.pos).ok_or(DagPbError::UnexpectedEof)?;
            self.pos += 1;

            let payload = (byte & 0x7F) as u64;
            if shift > 63 || (shift == 63 && payload > 1) {
                return Err(DagPbError::VarintOverflow);
            }
            result |= payload << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    fn bytes(&mut self) -> Result<&'a [u8], DagPbError> {
        let len = usize::try_from(self.varint()?).map_err(|_| DagPbError::UnexpectedEof)?;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or(DagPbError::UnexpectedEof)?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn field(&mut self) -> Result<Option<(u64, Field<'a>)>, DagPbError> {
        if self.pos == self.buf.len() {
            return Ok(None);
        }
        let tag = self.varint()?;
        let (number, wire_type) = (tag >> 3, tag & 0x7);
        let value = match wire_type {
            WIRE_VARINT => Field::Varint(self.varint()?),
            WIRE_LEN => Field::Bytes(self.bytes()?),
            _ => {
                return Err(DagPbError::WireType {
                    field: number,
                    wire_type,
                })
            }
        };
        Ok(Some((number, value)))
    }
}

/// Decode a protobuf `PBNode { Links, Data }`
pub fn decode(bytes: &[u8]) -> Result<Block, DagPbError> {
    let mut reader = Reader::new(bytes);
    let mut data: &[u8] = &[];
    let mut links = vec![];
    while let Some((number, value)) = reader.field()? {
        match (number, value) {
            (DATA, Field::Bytes(bytes)) => data = bytes,
            (LINKS, Field::Bytes(bytes)) => links.push(decode_link(bytes)?),
            (number, _) => return Err(DagPbError::UnexpectedField(number)),
        }
    }
    Ok(Block::new(data.to_vec(), links))
}

fn decode_link(bytes: &[u8]) -> Result<Link, DagPbError> {
    let mut reader = Reader::new(bytes);
    let mut hash = None;
    let mut name = String::new();
    let mut size = 0;
    while let Some((number, value)) = reader.field()? {
        match (number, value) {
            (LINK_HASH, Field::Bytes(bytes)) => hash = Some(Cid::try_from(bytes)?),
            (LINK_NAME, Field::Bytes(bytes)) => name = String::from_utf8(bytes.to_vec())?,
            (LINK_TSIZE, Field::Varint(tsize)) => size = tsize,
            (number, _) => return Err(DagPbError::UnexpectedField(number)),
        }
    }
    let cid: ContentId = hash.ok_or(DagPbError::MissingHash)?.into();
    Ok(Link { cid, name, size })
}

fn write_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn write_bytes(number: u64, bytes: &[u8], buf: &mut Vec<u8>) {
    write_varint(number << 3 | WIRE_LEN, buf);
    write_varint(bytes.len() as u64, buf);
    buf.extend_from_slice(bytes);
}

/// Canonical encoding: links in order, then data
pub fn encode(block: &Block) -> Vec<u8> {
    let mut buf = vec![];
    for link in block.links() {
        let mut link_buf = vec![];
        write_bytes(LINK_HASH, &link.cid.as_cid().to_bytes(), &mut link_buf);
        write_bytes(LINK_NAME, link.name.as_bytes(), &mut link_buf);
        write_varint(LINK_TSIZE << 3 | WIRE_VARINT, &mut link_buf);
        write_varint(link.size, &mut link_buf);
        write_bytes(LINKS, &link_buf, &mut buf);
    }
    write_bytes(DATA, block.data(), &mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT_V0: &str = "QmQe6m4QRoKk4Q7gxGMkUfanmtC4zgw1cS4nAux75iZqG4";

    #[test]
    fn data_only() {
        let block = decode(&[0x0a, 0x03, b'a', b'b', b'c']).unwrap();
        assert_eq!(block.data(), b"abc");
        assert!(block.links().is_empty());
        assert!(decode(&[]).unwrap().data().is_empty());
    }

    #[test]
    fn links_keep_order_and_metadata() {
        let links = vec![
            Link {
                cid: ROOT_V0.parse().unwrap(),
                name: "0".into(),
                size: 300,
            },
            Link::new(ROOT_V0.parse().unwrap()),
        ];
        let block = Block::new(r#"{"type":"Node","mins":[0,5]}"#, links);
        let bytes = encode(&block);
        // the first link starts right away, data comes last
        assert_eq!(bytes[0], 0x12);
        assert_eq!(decode(&bytes).unwrap(), block);
    }

    #[test]
    fn truncated() {
        let bytes = encode(&Block::new("leaf", vec![]));
        assert!(matches!(
            decode(&bytes[..bytes.len() - 1]),
            Err(DagPbError::UnexpectedEof)
        ));
        assert!(matches!(decode(&[0x0a]), Err(DagPbError::UnexpectedEof)));
        assert!(matches!(decode(&[0x0a, 0xff]), Err(DagPbError::UnexpectedEof)));
    }

    #[test]
    fn rejects_unexpected_fields() {
        // field 1 as varint
        assert!(matches!(decode(&[0x08, 0x01]), Err(DagPbError::UnexpectedField(1))));
        // fixed64 wire type
        assert!(matches!(
            decode(&[0x09, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(DagPbError::WireType { field: 1, wire_type: 1 })
        ));
        // link without hash
        assert!(matches!(
            decode(&[0x12, 0x02, 0x18, 0x01]),
            Err(DagPbError::MissingHash)
        ));
        // link hash that is not a CID
        assert!(matches!(
            decode(&[0x12, 0x03, 0x0a, 0x01, 0x00]),
            Err(DagPbError::Hash(_))
        ));
    }

    #[test]
    fn varint_overflow() {
        let mut reader = Reader::new(&[0xff; 11]);
        assert!(matches!(reader.varint(), Err(DagPbError::VarintOverflow)));
        let mut reader = Reader::new(&[0xac, 0x02]);
        assert_eq!(reader.varint().unwrap(), 300);
    }
}
