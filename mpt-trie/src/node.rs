//! # MPT Node Types
//!
//! The MPT has three node types plus the empty node:
//! 1. Leaf - stores a value at the end of a key
//! 2. Extension - shares a common prefix path
//! 3. Branch - 16-way branch point + optional value
//!
//! The node type is not stored. It is derived once, when a field list is
//! decoded: 17 fields is a branch, 2 fields is a leaf or an extension
//! depending on the flag nibble of the path, and no fields is empty.

use alloy_primitives::B256;
use mpt_error::{Error, Result};

use crate::codec::Field;
use crate::hasher::DIGEST_LEN;
use crate::nibbles::Nibbles;

/// Number of fields in an encoded branch node (16 children + value)
pub const BRANCH_FIELDS: usize = 17;

/// Reference from a parent node to a child
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NodeRef {
    /// Empty slot
    #[default]
    Empty,
    /// Hash reference to a node in storage
    Hash(B256),
    /// Child whose encoding is shorter than a digest, stored inside the parent
    Embedded(Box<Node>),
}

impl NodeRef {
    /// Check if empty
    pub fn is_empty(&self) -> bool {
        matches!(self, NodeRef::Empty)
    }

    /// Get hash if this is a hash reference
    pub fn as_hash(&self) -> Option<B256> {
        match self {
            NodeRef::Hash(h) => Some(*h),
            _ => None,
        }
    }

    /// Field this reference occupies in the parent's field list
    pub fn to_field(&self) -> Field {
        match self {
            NodeRef::Empty => Field::empty(),
            NodeRef::Hash(h) => Field::Bytes(h.to_vec()),
            NodeRef::Embedded(node) => node.to_field(),
        }
    }

    /// Parse a child slot of a decoded field list
    pub fn from_field(field: Field) -> Result<Self> {
        match field {
            Field::Bytes(bytes) if bytes.is_empty() => Ok(NodeRef::Empty),
            Field::Bytes(bytes) if bytes.len() == DIGEST_LEN => {
                Ok(NodeRef::Hash(B256::from_slice(&bytes)))
            }
            Field::Bytes(bytes) => Err(Error::malformed_node(format!(
                "child reference of {} bytes is neither empty nor a digest",
                bytes.len()
            ))),
            Field::List(items) => Ok(NodeRef::Embedded(Box::new(Node::from_field(Field::List(
                items,
            ))?))),
        }
    }
}

/// MPT node types
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Node {
    /// Empty node (null), never persisted
    #[default]
    Empty,

    /// Leaf node: [encoded_path, value]
    /// The path is the remaining key nibbles
    Leaf { key: Nibbles, value: Vec<u8> },

    /// Extension node: [encoded_path, child]
    /// Shares a common prefix to save space
    Extension { key: Nibbles, child: NodeRef },

    /// Branch node: [child0, child1, ..., child15, value]
    /// 16 children (one per nibble) + optional value
    Branch {
        children: Box<[NodeRef; 16]>,
        value: Option<Vec<u8>>,
    },
}

impl Node {
    /// Create empty branch node
    pub fn empty_branch() -> Self {
        Node::Branch {
            children: Box::default(),
            value: None,
        }
    }

    /// Create leaf node
    pub fn leaf(key: Nibbles, value: Vec<u8>) -> Self {
        Node::Leaf { key, value }
    }

    /// Create extension node
    pub fn extension(key: Nibbles, child: NodeRef) -> Self {
        Node::Extension { key, child }
    }

    /// Check if node is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }

    /// The node's own path (empty for branch and empty nodes)
    pub fn path(&self) -> Option<&Nibbles> {
        match self {
            Node::Leaf { key, .. } | Node::Extension { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Field list representation of this node
    pub fn to_field(&self) -> Field {
        match self {
            Node::Empty => Field::empty(),

            Node::Leaf { key, value } => Field::List(vec![
                Field::Bytes(key.to_hex_prefix(true)),
                Field::Bytes(value.clone()),
            ]),

            Node::Extension { key, child } => {
                Field::List(vec![Field::Bytes(key.to_hex_prefix(false)), child.to_field()])
            }

            Node::Branch { children, value } => {
                let mut items: Vec<Field> = Vec::with_capacity(BRANCH_FIELDS);
                items.extend(children.iter().map(NodeRef::to_field));
                items.push(Field::Bytes(value.clone().unwrap_or_default()));
                Field::List(items)
            }
        }
    }

    /// Classify a decoded field list.
    ///
    /// Any shape other than 0, 2 or 17 fields is a malformed node.
    pub fn from_field(field: Field) -> Result<Self> {
        let items = match field {
            Field::Bytes(bytes) if bytes.is_empty() => return Ok(Node::Empty),
            Field::Bytes(bytes) => {
                return Err(Error::malformed_node(format!(
                    "node is a {} byte string, not a field list",
                    bytes.len()
                )))
            }
            Field::List(items) => items,
        };

        match items.len() {
            0 => Ok(Node::Empty),
            2 => decode_short(items),
            BRANCH_FIELDS => decode_branch(items),
            n => Err(Error::malformed_node(format!("node has {} fields", n))
                .with_context("fields", n.to_string())),
        }
    }
}

fn decode_short(items: Vec<Field>) -> Result<Node> {
    let mut items = items.into_iter();
    let (Some(path), Some(payload)) = (items.next(), items.next()) else {
        return Err(Error::malformed_node("short node needs two fields"));
    };

    let encoded_path = path
        .as_bytes()
        .ok_or_else(|| Error::malformed_node("node path is a nested list"))?;
    let (key, is_leaf) = Nibbles::from_hex_prefix(encoded_path)
        .ok_or_else(|| Error::malformed_node("invalid hex prefix flag"))?;

    if is_leaf {
        match payload {
            Field::Bytes(value) => Ok(Node::Leaf { key, value }),
            Field::List(_) => Err(Error::malformed_node("leaf value is a nested list")),
        }
    } else {
        if key.is_empty() {
            return Err(Error::malformed_node("extension with empty path"));
        }
        let child = NodeRef::from_field(payload)?;
        if child.is_empty() {
            return Err(Error::malformed_node("extension without target"));
        }
        Ok(Node::Extension { key, child })
    }
}

fn decode_branch(items: Vec<Field>) -> Result<Node> {
    let mut children: Box<[NodeRef; 16]> = Box::default();
    let mut items = items.into_iter();

    for slot in children.iter_mut() {
        let field = items
            .next()
            .ok_or_else(|| Error::malformed_node("branch is missing children"))?;
        *slot = NodeRef::from_field(field)?;
    }

    let value = match items.next() {
        Some(Field::Bytes(value)) if value.is_empty() => None,
        Some(Field::Bytes(value)) => Some(value),
        Some(Field::List(_)) => return Err(Error::malformed_node("branch value is a nested list")),
        None => return Err(Error::malformed_node("branch is missing its value slot")),
    };

    Ok(Node::Branch { children, value })
}
