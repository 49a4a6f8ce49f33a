use crate::error::{Error, Result};
use crate::hash::Hash;

/// node type tags in the binary encoding
const TAG_LEAF: u8 = 0x01;
const TAG_INTERNAL: u8 = 0x02;

/// a key/value pair. keys are opaque non-empty byte strings ordered
/// lexicographically; values are opaque and may be empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pair {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Pair {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// reference to a child node: the minimum key of its subtree plus its digest
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildRef {
    pub key: Vec<u8>,
    pub hash: Hash,
}

/// a prolly tree node: sorted pairs at the leaves, sorted child references
/// above them
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Leaf(Vec<Pair>),
    Internal(Vec<ChildRef>),
}

/// append the canonical encoding of one pair:
/// `[4-byte key length][key][4-byte value length][value]`, lengths big-endian.
///
/// this layout is shared with the chunker: the bytes the chunker hashes are
/// exactly the bytes the leaf encoder writes.
pub fn encode_pair_into(buf: &mut Vec<u8>, key: &[u8], value: &[u8]) {
    buf.extend_from_slice(&(key.len() as u32).to_be_bytes());
    buf.extend_from_slice(key);
    buf.extend_from_slice(&(value.len() as u32).to_be_bytes());
    buf.extend_from_slice(value);
}

/// canonical encoding of one pair as an owned buffer
pub fn encode_pair(key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + key.len() + value.len());
    encode_pair_into(&mut buf, key, value);
    buf
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// deterministic binary encoding: 1-byte tag, 4-byte big-endian entry
    /// count, then the entries. equal nodes encode to equal bytes; node
    /// identity is the digest of this encoding.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Node::Leaf(pairs) => {
                let size = 5 + pairs
                    .iter()
                    .map(|p| 8 + p.key.len() + p.value.len())
                    .sum::<usize>();
                let mut buf = Vec::with_capacity(size);
                buf.push(TAG_LEAF);
                buf.extend_from_slice(&(pairs.len() as u32).to_be_bytes());
                for pair in pairs {
                    encode_pair_into(&mut buf, &pair.key, &pair.value);
                }
                buf
            }
            Node::Internal(children) => {
                let size = 5 + children.iter().map(|c| 36 + c.key.len()).sum::<usize>();
                let mut buf = Vec::with_capacity(size);
                buf.push(TAG_INTERNAL);
                buf.extend_from_slice(&(children.len() as u32).to_be_bytes());
                for child in children {
                    buf.extend_from_slice(&(child.key.len() as u32).to_be_bytes());
                    buf.extend_from_slice(&child.key);
                    buf.extend_from_slice(child.hash.as_bytes());
                }
                buf
            }
        }
    }

    /// digest of the canonical encoding
    pub fn digest(&self) -> Hash {
        Hash::of(&self.encode())
    }

    /// decode a node, rejecting unknown tags, truncated fields, and trailing
    /// bytes
    pub fn decode(data: &[u8]) -> Result<Node> {
        let mut r = ByteReader::new(data);

        let tag = r.take_u8("node tag")?;
        let count = r.take_u32("entry count")?;

        let node = match tag {
            TAG_LEAF => {
                let mut pairs = Vec::with_capacity(count.min(1024) as usize);
                for _ in 0..count {
                    let key = r.take_prefixed("key")?.to_vec();
                    let value = r.take_prefixed("value")?.to_vec();
                    pairs.push(Pair { key, value });
                }
                Node::Leaf(pairs)
            }
            TAG_INTERNAL => {
                let mut children = Vec::with_capacity(count.min(1024) as usize);
                for _ in 0..count {
                    let key = r.take_prefixed("child key")?.to_vec();
                    let digest = r.take("child digest", 32)?;
                    let mut arr = [0u8; 32];
                    arr.copy_from_slice(digest);
                    children.push(ChildRef {
                        key,
                        hash: Hash::from_bytes(arr),
                    });
                }
                Node::Internal(children)
            }
            other => {
                return Err(Error::CorruptObject(format!("unknown node tag {other:#04x}")));
            }
        };

        r.finish()?;
        Ok(node)
    }
}

/// bounds-checked reader over an encoded node
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, what: &str, n: usize) -> Result<&'a [u8]> {
        if self.data.len() - self.pos < n {
            return Err(Error::CorruptObject(format!("insufficient data for {what}")));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn take_u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(what, 1)?[0])
    }

    fn take_u32(&mut self, what: &str) -> Result<u32> {
        let bytes = self.take(what, 4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// a length-prefixed field: 4-byte big-endian length, then that many bytes
    fn take_prefixed(&mut self, what: &str) -> Result<&'a [u8]> {
        let len = self.take_u32(what)? as usize;
        self.take(what, len)
    }

    fn finish(&self) -> Result<()> {
        let remaining = self.data.len() - self.pos;
        if remaining != 0 {
            return Err(Error::CorruptObject(format!(
                "unexpected trailing data ({remaining} bytes remaining)"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_leaf() -> Node {
        Node::Leaf(vec![
            Pair::new("apple", "red"),
            Pair::new("banana", "yellow"),
            Pair::new("cherry", ""),
        ])
    }

    fn sample_internal() -> Node {
        Node::Internal(vec![
            ChildRef {
                key: b"apple".to_vec(),
                hash: Hash::of(b"left"),
            },
            ChildRef {
                key: b"melon".to_vec(),
                hash: Hash::of(b"right"),
            },
        ])
    }

    #[test]
    fn test_leaf_roundtrip() {
        let node = sample_leaf();
        let decoded = Node::decode(&node.encode()).unwrap();
        assert_eq!(node, decoded);
    }

    #[test]
    fn test_internal_roundtrip() {
        let node = sample_internal();
        let decoded = Node::decode(&node.encode()).unwrap();
        assert_eq!(node, decoded);
    }

    #[test]
    fn test_empty_leaf_roundtrip() {
        let node = Node::Leaf(vec![]);
        let encoded = node.encode();
        assert_eq!(encoded, vec![0x01, 0, 0, 0, 0]);
        assert_eq!(Node::decode(&encoded).unwrap(), node);
    }

    #[test]
    fn test_encoding_determinism() {
        assert_eq!(sample_leaf().encode(), sample_leaf().encode());
        assert_eq!(sample_internal().encode(), sample_internal().encode());
        assert_eq!(sample_leaf().digest(), sample_leaf().digest());
    }

    #[test]
    fn test_leaf_encoding_layout() {
        let node = Node::Leaf(vec![Pair::new("k", "vv")]);
        let encoded = node.encode();
        assert_eq!(
            encoded,
            vec![
                0x01, // leaf tag
                0, 0, 0, 1, // one pair
                0, 0, 0, 1, b'k', // key
                0, 0, 0, 2, b'v', b'v', // value
            ]
        );
    }

    #[test]
    fn test_pair_encoding_matches_leaf_entry() {
        // the chunker hashes exactly the bytes the leaf encoder writes
        let node = Node::Leaf(vec![Pair::new("key", "value")]);
        let entry = encode_pair(b"key", b"value");
        assert_eq!(&node.encode()[5..], &entry[..]);
    }

    #[test]
    fn test_decode_unknown_tag() {
        let result = Node::decode(&[0x07, 0, 0, 0, 0]);
        assert!(matches!(result, Err(Error::CorruptObject(_))));
    }

    #[test]
    fn test_decode_empty_input() {
        assert!(matches!(Node::decode(&[]), Err(Error::CorruptObject(_))));
    }

    #[test]
    fn test_decode_truncated_count() {
        assert!(matches!(
            Node::decode(&[0x01, 0, 0]),
            Err(Error::CorruptObject(_))
        ));
    }

    #[test]
    fn test_decode_truncated_entry() {
        let mut encoded = sample_leaf().encode();
        encoded.truncate(encoded.len() - 3);
        assert!(matches!(
            Node::decode(&encoded),
            Err(Error::CorruptObject(_))
        ));
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let mut encoded = sample_leaf().encode();
        encoded.push(0xff);
        assert!(matches!(
            Node::decode(&encoded),
            Err(Error::CorruptObject(_))
        ));
    }

    #[test]
    fn test_decode_truncated_child_digest() {
        let node = Node::Internal(vec![ChildRef {
            key: b"a".to_vec(),
            hash: Hash::ZERO,
        }]);
        let mut encoded = node.encode();
        encoded.truncate(encoded.len() - 1);
        assert!(matches!(
            Node::decode(&encoded),
            Err(Error::CorruptObject(_))
        ));
    }
}
