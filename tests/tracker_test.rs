mod common;

use common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use streamertip_core::ports::ReceiptState;
use streamertip_core::services::{ConfirmationStatus, TrackError, TransactionTracker};

fn tracker(chain: Arc<ScriptedChain>) -> TransactionTracker {
    TransactionTracker::new(chain, Duration::from_millis(5))
}

#[tokio::test]
async fn test_waits_for_required_confirmations() {
    let chain = Arc::new(ScriptedChain::new(vec![
        Ok(ReceiptState::NotFound),
        Ok(ReceiptState::Included { confirmations: 1 }),
        Ok(ReceiptState::Included { confirmations: 2 }),
        Ok(ReceiptState::Included { confirmations: 3 }),
    ]));
    let mut seen = Vec::new();

    let status = tracker(chain.clone())
        .with_required_confirmations(3)
        .track(HASH, |status| seen.push(status))
        .await
        .unwrap();

    assert!(status.is_confirmed);
    assert_eq!(chain.polls.load(Ordering::SeqCst), 4);
    assert_eq!(
        seen.last(),
        Some(&ConfirmationStatus {
            is_confirming: false,
            is_confirmed: true
        })
    );
    assert!(seen.first().unwrap().is_confirming);
}

#[tokio::test]
async fn test_keeps_polling_through_rpc_errors() {
    let chain = Arc::new(ScriptedChain::new(vec![
        Err("header not found".to_string()),
        Err("header not found".to_string()),
        Ok(ReceiptState::Included { confirmations: 1 }),
    ]));

    let status = tracker(chain.clone()).track(HASH, |_| {}).await.unwrap();

    assert!(status.is_confirmed);
    assert_eq!(chain.polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_reverted() {
    let chain = Arc::new(ScriptedChain::new(vec![
        Ok(ReceiptState::NotFound),
        Ok(ReceiptState::Reverted),
    ]));

    let result = tracker(chain).track(HASH, |_| {}).await;

    assert_eq!(result, Err(TrackError::Reverted(HASH)));
}

#[tokio::test(start_paused = true)]
async fn test_times_out() {
    let chain = Arc::new(ScriptedChain::new(vec![Ok(ReceiptState::NotFound)]));

    let result = tracker(chain)
        .with_timeout(Some(Duration::from_secs(30)))
        .track(HASH, |_| {})
        .await;

    assert_eq!(
        result,
        Err(TrackError::TimedOut {
            hash: HASH,
            after: Duration::from_secs(30)
        })
    );
}

#[tokio::test]
async fn test_watch_reports_latest() {
    let chain = Arc::new(ScriptedChain::new(vec![
        Ok(ReceiptState::NotFound),
        Ok(ReceiptState::Included { confirmations: 1 }),
    ]));

    let mut rx = tracker(chain).watch(HASH);
    let confirmed = rx.wait_for(|status| status.is_confirmed).await.unwrap();

    assert!(!confirmed.is_confirming);
}

#[tokio::test]
async fn test_zero_poll_interval_still_polls() {
    let chain = Arc::new(ScriptedChain::new(vec![
        Ok(ReceiptState::NotFound),
        Ok(ReceiptState::Included { confirmations: 1 }),
    ]));

    let status = TransactionTracker::new(chain.clone(), Duration::ZERO)
        .track(HASH, |_| {})
        .await
        .unwrap();

    assert!(status.is_confirmed);
    assert_eq!(chain.polls.load(Ordering::SeqCst), 2);
}
