//! Unit tests for the offset-feedback paginator

use std::sync::{Arc, Mutex};

use ad_report_client::client::{ClientError, Page, Paginator};

#[tokio::test]
async fn single_full_page_completes_in_one_call() {
    let offsets: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
    let mut paginator = Paginator::new(100, 10);

    let seen = offsets.clone();
    let result = paginator
        .fetch_all(move |_limit, offset| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(offset);
                Ok(Page::last(vec![10, 20]))
            }
        })
        .await
        .unwrap();

    assert_eq!(result, vec![10, 20]);
    assert_eq!(*offsets.lock().unwrap(), vec![0]);
}

#[tokio::test]
async fn continuation_offset_feeds_the_next_call() {
    let offsets: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
    let mut paginator = Paginator::new(2, 10);

    let seen = offsets.clone();
    let result = paginator
        .fetch_all(move |_limit, offset| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(offset);
                if offset == 0 {
                    Ok(Page::partial(vec![1, 2], 3))
                } else {
                    Ok(Page::last(vec![3]))
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(result, vec![1, 2, 3]);
    assert_eq!(*offsets.lock().unwrap(), vec![0, 3]);
}

#[tokio::test]
async fn cursor_resets_after_completion() {
    let mut paginator = Paginator::new(5, 10);

    paginator
        .fetch_all(|_limit, offset| async move {
            if offset == 0 {
                Ok(Page::partial(vec![1], 5))
            } else {
                Ok(Page::last(Vec::<i32>::new()))
            }
        })
        .await
        .unwrap();

    assert_eq!(paginator.cursor().offset, 0);
}

#[tokio::test]
async fn cursor_resets_after_a_fetch_error() {
    let mut paginator = Paginator::new(5, 10);

    let result = paginator
        .fetch_all(|_limit, offset| async move {
            if offset == 0 {
                Ok(Page::partial(vec![1i32], 5))
            } else {
                Err(ClientError::Api("denied".into()))
            }
        })
        .await;

    assert!(matches!(result, Err(ClientError::Api(_))));
    assert_eq!(paginator.cursor().offset, 0);
}

#[tokio::test]
async fn safety_cap_aborts_an_endless_collection() {
    let calls = Arc::new(Mutex::new(0usize));
    let mut paginator = Paginator::new(1, 50);

    let counter = calls.clone();
    let result = paginator
        .fetch_all(move |_limit, offset| {
            let counter = counter.clone();
            async move {
                *counter.lock().unwrap() += 1;
                // Server keeps handing out continuation offsets forever.
                Ok(Page::partial(vec![0i32], offset + 1))
            }
        })
        .await;

    assert!(matches!(
        result,
        Err(ClientError::PaginationExhausted { pages: 50 })
    ));
    assert_eq!(*calls.lock().unwrap(), 50);
    assert_eq!(paginator.cursor().offset, 0);
}

#[tokio::test]
async fn empty_collection_yields_no_items() {
    let mut paginator = Paginator::new(10, 10);

    let result = paginator
        .fetch_all(|_limit, _offset| async { Ok(Page::last(Vec::<i32>::new())) })
        .await
        .unwrap();

    assert!(result.is_empty());
}
