//! Property-based test generators using proptest.
//!
//! Provides strategies for file contents, chunk sizes, and edits that turn
//! one file into a related one.

use proptest::prelude::*;

/// Strategy for file contents up to `max_len` bytes.
pub fn file_data_strategy(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Strategy for small chunk sizes, so short inputs still span many chunks.
pub fn chunk_size_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![Just(1u64), Just(4), Just(7), 2u64..=64]
}

/// An edit applied to a byte buffer.
#[derive(Debug, Clone)]
pub enum FileEdit {
    /// Overwrite bytes starting at a position.
    Overwrite {
        /// Position, taken modulo the buffer length.
        at: usize,
        /// Replacement bytes.
        data: Vec<u8>,
    },
    /// Append bytes at the end.
    Append {
        /// Appended bytes.
        data: Vec<u8>,
    },
    /// Cut the buffer.
    Truncate {
        /// New length, clamped to the current length.
        len: usize,
    },
}

impl FileEdit {
    /// Applies the edit to `buf`.
    pub fn apply(&self, buf: &mut Vec<u8>) {
        match self {
            FileEdit::Overwrite { at, data } => {
                if buf.is_empty() {
                    return;
                }
                let start = at % buf.len();
                let end = (start + data.len()).min(buf.len());
                buf[start..end].copy_from_slice(&data[..end - start]);
            }
            FileEdit::Append { data } => buf.extend_from_slice(data),
            FileEdit::Truncate { len } => {
                let len = (*len).min(buf.len());
                buf.truncate(len);
            }
        }
    }
}

/// Strategy for a single edit.
pub fn file_edit_strategy() -> impl Strategy<Value = FileEdit> {
    let bytes = prop::collection::vec(any::<u8>(), 1..32);
    prop_oneof![
        3 => (any::<usize>(), bytes.clone())
            .prop_map(|(at, data)| FileEdit::Overwrite { at, data }),
        1 => bytes.prop_map(|data| FileEdit::Append { data }),
        1 => (0usize..512).prop_map(|len| FileEdit::Truncate { len }),
    ]
}

/// Strategy for a `(source, destination)` pair where the destination is the
/// source with a few edits applied.
pub fn related_pair_strategy(max_len: usize) -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    (
        file_data_strategy(max_len),
        prop::collection::vec(file_edit_strategy(), 0..4),
    )
        .prop_map(|(source, edits)| {
            let mut destination = source.clone();
            for edit in &edits {
                edit.apply(&mut destination);
            }
            (source, destination)
        })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_keeps_length() {
        let mut buf = vec![0u8; 4];
        FileEdit::Overwrite {
            at: 6,
            data: vec![9, 9, 9],
        }
        .apply(&mut buf);
        assert_eq!(buf, vec![0, 0, 9, 9]);
    }

    #[test]
    fn edits_on_empty_buffer() {
        let mut buf = Vec::new();
        FileEdit::Overwrite { at: 3, data: vec![1] }.apply(&mut buf);
        FileEdit::Truncate { len: 10 }.apply(&mut buf);
        assert!(buf.is_empty());
        FileEdit::Append { data: vec![1, 2] }.apply(&mut buf);
        assert_eq!(buf, vec![1, 2]);
    }

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn chunk_sizes_are_positive(size in chunk_size_strategy()) {
            prop_assert!(size >= 1);
        }

        #[test]
        fn file_data_respects_bound(data in file_data_strategy(100)) {
            prop_assert!(data.len() <= 100);
        }
    }
}
