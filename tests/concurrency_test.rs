use payledger::application::engine::PaymentEngine;
use payledger::application::requests::{CancelRequest, PayRequest};
use payledger::domain::ports::TransactionStore;
use payledger::domain::transaction::TransactionId;
use payledger::error::PaymentError;
use payledger::infrastructure::in_memory::{InMemorySettlementGateway, InMemoryTransactionStore};
use std::sync::Arc;

mod common;

fn pay_request(card_number: &str) -> PayRequest {
    PayRequest {
        card_number: card_number.to_string(),
        expiry: "1225".to_string(),
        cvc: "777".to_string(),
        installment: 0,
        amount: 1000,
        vat: None,
    }
}

#[tokio::test]
async fn test_same_card_second_pay_conflicts_immediately() {
    let gateway = common::ParkingGateway::default();
    let engine = Arc::new(PaymentEngine::new(
        Box::new(InMemoryTransactionStore::new()),
        Box::new(gateway.clone()),
    ));

    let first = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.pay(pay_request("1234567890123456")).await }
    });
    // The first payment is now parked inside settlement, holding the card.
    gateway.wait_entered().await;

    let second = engine.pay(pay_request("1234567890123456")).await;
    assert!(matches!(second, Err(PaymentError::ConflictError(_))));
    assert!(second.unwrap_err().is_retryable());

    gateway.release_one();
    let first = first.await.unwrap();
    assert!(first.is_ok());

    // Released on completion: the card can pay again.
    let third = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.pay(pay_request("1234567890123456")).await }
    });
    gateway.wait_entered().await;
    gateway.release_one();
    assert!(third.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_different_cards_proceed_in_parallel() {
    let gateway = common::ParkingGateway::default();
    let engine = Arc::new(PaymentEngine::new(
        Box::new(InMemoryTransactionStore::new()),
        Box::new(gateway.clone()),
    ));

    let first = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.pay(pay_request("1111111111")).await }
    });
    gateway.wait_entered().await;

    // Another card is admitted while the first is still in flight.
    let second = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.pay(pay_request("2222222222")).await }
    });
    gateway.wait_entered().await;

    gateway.release_one();
    gateway.release_one();
    assert!(first.await.unwrap().is_ok());
    assert!(second.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_racing_cancels_one_loses_on_version() {
    let store = InMemoryTransactionStore::new();
    let engine = PaymentEngine::new(
        Box::new(store.clone()),
        Box::new(InMemorySettlementGateway::new()),
    );
    let pay = engine.pay(pay_request("1234567890123456")).await.unwrap();
    let id: &TransactionId = &pay.transaction_id;

    // Two readers load the same version of the parent.
    let mut first = store.find_by_transaction_id(id).await.unwrap().unwrap();
    let mut second = first.clone();
    let c1 = first.request_cancel(600, None).unwrap();
    let c2 = second.request_cancel(600, None).unwrap();

    store.save_all(vec![c1, first]).await.unwrap();
    let result = store.save_all(vec![c2, second]).await;
    assert!(matches!(result, Err(PaymentError::ConflictError(_))));

    // Only one cancellation landed; the balance was never double-spent.
    let view = engine.find(id.as_str()).await.unwrap();
    assert_eq!(view.cancellations.len(), 1);
    assert_eq!(view.transaction.remain_amount(), 400);

    // A fresh read can still cancel what is left.
    let result = engine
        .cancel(id.as_str(), CancelRequest { amount: 400, vat: None })
        .await;
    assert!(result.is_ok());
}
