//! # Chunker
//!
//! Pure partitioning of an ordered item list under a size policy.
//!
//! The chunker is used two ways: callers can split arbitrary entry lists
//! with a configured [`ChunkPolicy`], and the coordinator feeds it a derived
//! per-batch size to produce the parallel batches of one operation. Both
//! paths share the same guarantees: relative order is preserved, the
//! concatenation of the output equals the input, and a bounded policy of
//! *n* yields `ceil(len / n)` chunks.

use crate::error::{Result, StagehandError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Size policy for [`chunk`].
///
/// External callers historically pass the unbounded sentinel either as a
/// dedicated value or as numeric `-1`; both parse to [`ChunkPolicy::Unbounded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkPolicy {
    /// At most this many items per chunk; the last chunk may be shorter.
    Bounded(usize),
    /// Emit the whole input as a single chunk.
    Unbounded,
}

impl TryFrom<i64> for ChunkPolicy {
    type Error = StagehandError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            -1 => Ok(ChunkPolicy::Unbounded),
            v if v > 0 => Ok(ChunkPolicy::Bounded(v as usize)),
            v => Err(StagehandError::ConfigurationError(format!(
                "chunk size must be a positive integer or the unbounded sentinel, got {v}"
            ))),
        }
    }
}

impl FromStr for ChunkPolicy {
    type Err = StagehandError;

    fn from_str(value: &str) -> Result<Self> {
        if value.trim().eq_ignore_ascii_case("unbounded") {
            return Ok(ChunkPolicy::Unbounded);
        }
        let numeric: i64 = value.trim().parse().map_err(|_| {
            StagehandError::ConfigurationError(format!(
                "chunk size must be a positive integer or the unbounded sentinel, got {value:?}"
            ))
        })?;
        ChunkPolicy::try_from(numeric)
    }
}

/// Partition `items` into ordered sub-lists under `policy`.
///
/// A bounded policy of zero is a configuration error: the chunker fails
/// closed rather than emitting empty chunks or looping.
pub fn chunk<T: Clone>(items: &[T], policy: ChunkPolicy) -> Result<Vec<Vec<T>>> {
    let size = match policy {
        ChunkPolicy::Unbounded => {
            if items.is_empty() {
                return Ok(Vec::new());
            }
            return Ok(vec![items.to_vec()]);
        }
        ChunkPolicy::Bounded(0) => {
            return Err(StagehandError::ConfigurationError(
                "chunk size must be at least 1".to_string(),
            ));
        }
        ChunkPolicy::Bounded(size) => size,
    };

    Ok(items.chunks(size).map(<[T]>::to_vec).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bounded_chunking() {
        let items: Vec<u32> = (0..10).collect();
        let chunks = chunk(&items, ChunkPolicy::Bounded(3)).unwrap();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], vec![0, 1, 2]);
        assert_eq!(chunks[3], vec![9]);
    }

    #[test]
    fn test_unbounded_returns_single_chunk() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(
            chunk(&items, ChunkPolicy::Unbounded).unwrap(),
            vec![items.clone()]
        );
    }

    #[test]
    fn test_oversized_bound_returns_single_chunk() {
        let items: Vec<u32> = (0..4).collect();
        assert_eq!(
            chunk(&items, ChunkPolicy::Bounded(100)).unwrap(),
            vec![items.clone()]
        );
        assert_eq!(
            chunk(&items, ChunkPolicy::Bounded(4)).unwrap(),
            vec![items.clone()]
        );
    }

    #[test]
    fn test_empty_input() {
        let items: Vec<u32> = Vec::new();
        assert!(chunk(&items, ChunkPolicy::Bounded(3)).unwrap().is_empty());
        assert!(chunk(&items, ChunkPolicy::Unbounded).unwrap().is_empty());
    }

    #[test]
    fn test_zero_size_fails_closed() {
        let items: Vec<u32> = (0..4).collect();
        assert!(matches!(
            chunk(&items, ChunkPolicy::Bounded(0)),
            Err(StagehandError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_policy_parsing_accepts_sentinels() {
        assert_eq!(ChunkPolicy::try_from(-1).unwrap(), ChunkPolicy::Unbounded);
        assert_eq!(
            "unbounded".parse::<ChunkPolicy>().unwrap(),
            ChunkPolicy::Unbounded
        );
        assert_eq!(
            "UNBOUNDED".parse::<ChunkPolicy>().unwrap(),
            ChunkPolicy::Unbounded
        );
        assert_eq!(
            "-1".parse::<ChunkPolicy>().unwrap(),
            ChunkPolicy::Unbounded
        );
        assert_eq!(
            "25".parse::<ChunkPolicy>().unwrap(),
            ChunkPolicy::Bounded(25)
        );
    }

    #[test]
    fn test_policy_parsing_fails_closed() {
        assert!(ChunkPolicy::try_from(0).is_err());
        assert!(ChunkPolicy::try_from(-5).is_err());
        assert!("0".parse::<ChunkPolicy>().is_err());
        assert!("-5".parse::<ChunkPolicy>().is_err());
        assert!("not-a-number".parse::<ChunkPolicy>().is_err());
    }

    proptest! {
        #[test]
        fn prop_bounded_chunking_partitions_input(
            items in prop::collection::vec(any::<u32>(), 0..200),
            size in 1usize..50,
        ) {
            let chunks = chunk(&items, ChunkPolicy::Bounded(size)).unwrap();

            let expected_count = items.len().div_ceil(size);
            prop_assert_eq!(chunks.len(), expected_count);

            for sub in &chunks {
                prop_assert!(!sub.is_empty());
                prop_assert!(sub.len() <= size);
            }

            let flattened: Vec<u32> = chunks.into_iter().flatten().collect();
            prop_assert_eq!(flattened, items);
        }
    }
}
