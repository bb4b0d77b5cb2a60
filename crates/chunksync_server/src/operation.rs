//! The closed set of operations served on the chunk endpoint.

use chunksync_manifest::{ChunkMetaResponse, METHOD_CHUNK, METHOD_CHUNK_META};

/// An operation selected by the `method` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Return the manifest of a file.
    ChunkMeta,
    /// Return a raw byte range of a file.
    Chunk,
}

/// `method` value to operation.
const OPERATIONS: &[(&str, Operation)] = &[
    (METHOD_CHUNK_META, Operation::ChunkMeta),
    (METHOD_CHUNK, Operation::Chunk),
];

impl Operation {
    /// Looks up the operation for a `method` value.
    pub fn lookup(method: &str) -> Option<Self> {
        OPERATIONS
            .iter()
            .find(|(name, _)| *name == method)
            .map(|(_, op)| *op)
    }

    /// Returns the `method` value for this operation.
    pub fn method(&self) -> &'static str {
        match self {
            Operation::ChunkMeta => METHOD_CHUNK_META,
            Operation::Chunk => METHOD_CHUNK,
        }
    }

    /// Returns every operation.
    pub fn all() -> impl Iterator<Item = Operation> {
        OPERATIONS.iter().map(|(_, op)| *op)
    }
}

/// What an operation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutput {
    /// A manifest response, sent as JSON.
    Manifest(ChunkMetaResponse),
    /// Raw chunk bytes.
    Bytes(Vec<u8>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_methods() {
        assert_eq!(Operation::lookup("getchunkmeta"), Some(Operation::ChunkMeta));
        assert_eq!(Operation::lookup("getchunk"), Some(Operation::Chunk));
        assert_eq!(Operation::lookup("GETCHUNK"), None);
        assert_eq!(Operation::lookup(""), None);
    }

    #[test]
    fn method_names_round_trip() {
        for op in Operation::all() {
            assert_eq!(Operation::lookup(op.method()), Some(op));
        }
    }
}
