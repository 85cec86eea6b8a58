//! Identifier chunking with shape-aware result merging
//!
//! Mutation and selection endpoints cap the number of identifiers accepted
//! per call. The [`Chunker`] splits a list into bounded chunks, invokes a
//! per-chunk operation, and merges the per-chunk results.
//!
//! The platform returns three result shapes, modelled as the
//! [`ChunkOutcome`] tagged union instead of runtime type inspection:
//! plain item lists, key maps, and structured mutation responses whose
//! add/update/delete categories are flattened into one list.

use serde_json::{Map, Value};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::{ClientError, ClientResult};

/// Identifier list argument, normalizing a single scalar into a one-element
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdList(Vec<i64>);

impl IdList {
    /// The normalized identifier sequence.
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    /// Consume into the underlying sequence.
    pub fn into_vec(self) -> Vec<i64> {
        self.0
    }
}

impl From<i64> for IdList {
    fn from(id: i64) -> Self {
        Self(vec![id])
    }
}

impl From<Vec<i64>> for IdList {
    fn from(ids: Vec<i64>) -> Self {
        Self(ids)
    }
}

impl From<&[i64]> for IdList {
    fn from(ids: &[i64]) -> Self {
        Self(ids.to_vec())
    }
}

impl TryFrom<&str> for IdList {
    type Error = ClientError;

    /// A numeric string identifier becomes a one-element list. Anything
    /// unparsable is rejected up front; a chunked call must never quietly
    /// degrade into zero upstream calls.
    fn try_from(id: &str) -> Result<Self, Self::Error> {
        id.trim()
            .parse::<i64>()
            .map(|v| Self(vec![v]))
            .map_err(|e| ClientError::InvalidInput(format!("identifier {id:?}: {e}")))
    }
}

/// Structured response of a mutation call, with one optional result list per
/// category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationResponse {
    /// Results of created objects.
    pub add_results: Option<Vec<Value>>,
    /// Results of updated objects.
    pub update_results: Option<Vec<Value>>,
    /// Results of deleted objects.
    pub delete_results: Option<Vec<Value>>,
}

/// Result of one per-chunk operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    /// An ordered item list, appended across chunks.
    Items(Vec<Value>),
    /// A key map, unioned across chunks (later chunks overwrite).
    Map(Map<String, Value>),
    /// A mutation response whose categories are flattened into the item
    /// accumulator in add/update/delete order.
    Mutation(MutationResponse),
}

impl ChunkOutcome {
    /// Number of merged elements this outcome contributes.
    fn merged_len(&self) -> usize {
        match self {
            ChunkOutcome::Items(items) => items.len(),
            ChunkOutcome::Map(map) => map.len(),
            ChunkOutcome::Mutation(resp) => {
                resp.add_results.as_ref().map_or(0, Vec::len)
                    + resp.update_results.as_ref().map_or(0, Vec::len)
                    + resp.delete_results.as_ref().map_or(0, Vec::len)
            }
        }
    }
}

/// Per-chunk tracking context shared between the chunker and the result
/// cache: the cache keys entries by chunk index and persists only the slice
/// the latest chunk produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkTracker {
    /// Index of the chunk currently (or last) processed.
    pub part_num: usize,
    /// Length of that chunk's merged result.
    pub last_len: usize,
}

/// Splits identifier lists into bounded chunks and merges per-chunk results.
pub struct Chunker {
    chunk_size: usize,
    tracker: Option<Arc<Mutex<ChunkTracker>>>,
}

impl Chunker {
    /// Build a chunker producing chunks of at most `chunk_size` identifiers.
    /// A zero size is treated as 1 to keep the split well-defined.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            tracker: None,
        }
    }

    /// Attach a shared tracking context for the cache layer.
    pub fn with_tracker(mut self, tracker: Arc<Mutex<ChunkTracker>>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Invoke `op` once per chunk of `ids` and merge the results by shape.
    ///
    /// Item lists concatenate in chunk order; key maps union with later
    /// chunks overwriting on collision; mutation responses contribute their
    /// present categories, flattened in add/update/delete order. A non-empty
    /// accumulated map wins over the accumulated list; with neither, an
    /// empty list is returned.
    pub async fn apply_chunked<F, Fut>(
        &self,
        ids: impl Into<IdList>,
        mut op: F,
    ) -> ClientResult<ChunkOutcome>
    where
        F: FnMut(Vec<i64>) -> Fut,
        Fut: Future<Output = ClientResult<ChunkOutcome>>,
    {
        let ids = ids.into().into_vec();
        let mut merged_items: Vec<Value> = Vec::new();
        let mut merged_map: Map<String, Value> = Map::new();

        for (part_num, chunk) in ids.chunks(self.chunk_size).enumerate() {
            if let Some(tracker) = &self.tracker {
                if let Ok(mut t) = tracker.lock() {
                    t.part_num = part_num;
                }
            }

            let outcome = op(chunk.to_vec()).await?;
            let produced = outcome.merged_len();
            debug!(part_num, ids = chunk.len(), produced, "chunk processed");

            if let Some(tracker) = &self.tracker {
                if let Ok(mut t) = tracker.lock() {
                    t.last_len = produced;
                }
            }

            match outcome {
                ChunkOutcome::Items(items) => merged_items.extend(items),
                ChunkOutcome::Map(map) => merged_map.extend(map),
                ChunkOutcome::Mutation(resp) => {
                    for category in [resp.add_results, resp.update_results, resp.delete_results]
                        .into_iter()
                        .flatten()
                    {
                        merged_items.extend(category);
                    }
                }
            }
        }

        if !merged_map.is_empty() {
            Ok(ChunkOutcome::Map(merged_map))
        } else {
            Ok(ChunkOutcome::Items(merged_items))
        }
    }
}
