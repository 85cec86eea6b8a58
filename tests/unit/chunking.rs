//! Unit tests for identifier chunking and result merging

use std::sync::{Arc, Mutex};

use ad_report_client::client::{
    ChunkOutcome, ChunkTracker, Chunker, ClientError, IdList, MutationResponse,
};
use serde_json::{json, Map, Value};

fn ids_as_values(ids: &[i64]) -> Vec<Value> {
    ids.iter().map(|id| json!(id)).collect()
}

#[tokio::test]
async fn splits_ids_into_bounded_chunks() {
    let chunks: Arc<Mutex<Vec<Vec<i64>>>> = Arc::new(Mutex::new(Vec::new()));
    let chunker = Chunker::new(2);

    let seen = chunks.clone();
    let outcome = chunker
        .apply_chunked(vec![1i64, 2, 3, 4, 5], move |chunk| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(chunk.clone());
                Ok(ChunkOutcome::Items(ids_as_values(&chunk)))
            }
        })
        .await
        .unwrap();

    assert_eq!(
        *chunks.lock().unwrap(),
        vec![vec![1, 2], vec![3, 4], vec![5]]
    );
    // Identity per chunk reproduces the full input in order.
    assert_eq!(
        outcome,
        ChunkOutcome::Items(ids_as_values(&[1, 2, 3, 4, 5]))
    );
}

#[tokio::test]
async fn single_chunk_when_input_fits() {
    let calls = Arc::new(Mutex::new(0usize));
    let chunker = Chunker::new(500);

    let counter = calls.clone();
    chunker
        .apply_chunked(vec![1i64, 2, 3], move |chunk| {
            let counter = counter.clone();
            async move {
                *counter.lock().unwrap() += 1;
                Ok(ChunkOutcome::Items(ids_as_values(&chunk)))
            }
        })
        .await
        .unwrap();

    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn map_results_union_with_later_chunks_overwriting() {
    let chunker = Chunker::new(1);

    let outcome = chunker
        .apply_chunked(vec![1i64, 2], |chunk| async move {
            let mut map = Map::new();
            map.insert("shared".to_string(), json!(chunk[0]));
            map.insert(format!("only_{}", chunk[0]), json!(true));
            Ok(ChunkOutcome::Map(map))
        })
        .await
        .unwrap();

    let ChunkOutcome::Map(map) = outcome else {
        panic!("expected a map outcome");
    };
    assert_eq!(map["shared"], json!(2));
    assert_eq!(map["only_1"], json!(true));
    assert_eq!(map["only_2"], json!(true));
}

#[tokio::test]
async fn mutation_categories_flatten_in_order() {
    let chunker = Chunker::new(10);

    let outcome = chunker
        .apply_chunked(vec![1i64], |_chunk| async move {
            Ok(ChunkOutcome::Mutation(MutationResponse {
                add_results: Some(vec![json!("a")]),
                update_results: Some(vec![json!("u1"), json!("u2")]),
                delete_results: None,
            }))
        })
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ChunkOutcome::Items(vec![json!("a"), json!("u1"), json!("u2")])
    );
}

#[tokio::test]
async fn nonempty_map_wins_over_items() {
    let chunker = Chunker::new(1);

    let outcome = chunker
        .apply_chunked(vec![1i64, 2], |chunk| async move {
            if chunk[0] == 1 {
                Ok(ChunkOutcome::Items(vec![json!("item")]))
            } else {
                let mut map = Map::new();
                map.insert("k".to_string(), json!(1));
                Ok(ChunkOutcome::Map(map))
            }
        })
        .await
        .unwrap();

    assert!(matches!(outcome, ChunkOutcome::Map(_)));
}

#[tokio::test]
async fn empty_input_returns_empty_items_without_calls() {
    let calls = Arc::new(Mutex::new(0usize));
    let chunker = Chunker::new(3);

    let counter = calls.clone();
    let outcome = chunker
        .apply_chunked(Vec::<i64>::new(), move |chunk| {
            let counter = counter.clone();
            async move {
                *counter.lock().unwrap() += 1;
                Ok(ChunkOutcome::Items(ids_as_values(&chunk)))
            }
        })
        .await
        .unwrap();

    assert_eq!(outcome, ChunkOutcome::Items(Vec::new()));
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn tracker_records_part_and_result_length() {
    let tracker = Arc::new(Mutex::new(ChunkTracker::default()));
    let observed: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let chunker = Chunker::new(2).with_tracker(tracker.clone());

    let t = tracker.clone();
    let parts = observed.clone();
    chunker
        .apply_chunked(vec![1i64, 2, 3], move |chunk| {
            let t = t.clone();
            let parts = parts.clone();
            async move {
                parts.lock().unwrap().push(t.lock().unwrap().part_num);
                Ok(ChunkOutcome::Items(ids_as_values(&chunk)))
            }
        })
        .await
        .unwrap();

    // The operation sees its own chunk index while it runs.
    assert_eq!(*observed.lock().unwrap(), vec![0, 1]);
    let final_state = *tracker.lock().unwrap();
    assert_eq!(final_state.part_num, 1);
    assert_eq!(final_state.last_len, 1);
}

#[test]
fn id_list_coercions() {
    assert_eq!(IdList::from(42i64).as_slice(), &[42]);
    assert_eq!(IdList::from(vec![1i64, 2]).as_slice(), &[1, 2]);
    assert_eq!(IdList::try_from("17").unwrap().as_slice(), &[17]);
    assert_eq!(IdList::try_from(" 17 ").unwrap().as_slice(), &[17]);
}

#[test]
fn unparsable_identifier_string_is_rejected() {
    // Bad input must surface instead of degrading into an empty chunk run.
    assert!(matches!(
        IdList::try_from("not a number"),
        Err(ClientError::InvalidInput(_))
    ));
    assert!(matches!(
        IdList::try_from(""),
        Err(ClientError::InvalidInput(_))
    ));
}
