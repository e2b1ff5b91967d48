use payledger::domain::card_cipher::CardInfo;
use payledger::domain::ports::{SettlementGatewayBox, TransactionStoreBox};
use payledger::domain::transaction::Transaction;
use payledger::infrastructure::in_memory::{InMemorySettlementGateway, InMemoryTransactionStore};

#[tokio::test]
async fn test_ports_as_trait_objects() {
    let transaction_store: TransactionStoreBox = Box::new(InMemoryTransactionStore::new());
    let gateway = InMemorySettlementGateway::new();
    let settlement: SettlementGatewayBox = Box::new(gateway.clone());

    let card = CardInfo::new("1234567890123456", "1225", "777").unwrap();
    let tx = Transaction::new_pay(card, 0, 1000, None).unwrap();
    let id = tx.transaction_id().clone();
    let message = tx.message().to_string();

    // Verify Send + Sync by spawning tasks
    let ts_handle = tokio::spawn(async move {
        transaction_store.save(tx).await.unwrap();
        transaction_store
            .find_by_transaction_id(&id)
            .await
            .unwrap()
            .unwrap()
    });

    let gw_handle = tokio::spawn(async move { settlement.send(&message).await.unwrap() });

    let retrieved = ts_handle.await.unwrap();
    assert_eq!(retrieved.version(), 1);
    assert!(gw_handle.await.unwrap());
    assert_eq!(gateway.messages().await.len(), 1);
}
