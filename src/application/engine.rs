use crate::application::admission::AdmissionGate;
use crate::application::requests::{
    CancelReceipt, CancelRequest, PayReceipt, PayRequest, TransactionView,
};
use crate::domain::card_cipher::CardInfo;
use crate::domain::ports::{SettlementGatewayBox, TransactionStoreBox};
use crate::domain::transaction::{Transaction, TransactionId, TransactionType};
use crate::error::{PaymentError, Result};
use tracing::{debug, error, info, warn};

/// The entry point for pay, cancel and find.
///
/// `PaymentEngine` owns the store, the settlement gateway and the admission
/// gate. Payment creation is serialized per card number by the gate;
/// cancellation relies on the store's version check instead. Failures are
/// never recovered here, only logged and returned.
pub struct PaymentEngine {
    transaction_store: TransactionStoreBox,
    settlement: SettlementGatewayBox,
    admission: AdmissionGate,
}

impl PaymentEngine {
    /// Creates a new `PaymentEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `transaction_store` - The store for ledger records.
    /// * `settlement` - The counterpart that receives encoded messages.
    pub fn new(transaction_store: TransactionStoreBox, settlement: SettlementGatewayBox) -> Self {
        Self {
            transaction_store,
            settlement,
            admission: AdmissionGate::new(),
        }
    }

    /// Creates, stores and settles a payment.
    ///
    /// Fails fast with a conflict if another payment for the same card number
    /// is in flight. The card number is released on every exit path.
    pub async fn pay(&self, request: PayRequest) -> Result<PayReceipt> {
        let Some(_permit) = self.admission.admit(&request.card_number) else {
            warn!("payment refused: card number already in flight");
            return Err(PaymentError::ConflictError(
                "only one request per card number may be processed concurrently".to_string(),
            ));
        };

        self.create_pay(request)
            .await
            .inspect_err(|e| error!(error = %e, "error during create pay transaction"))
    }

    async fn create_pay(&self, request: PayRequest) -> Result<PayReceipt> {
        let card = CardInfo::new(request.card_number, request.expiry, request.cvc)?;
        let tx = Transaction::new_pay(card, request.installment, request.amount, request.vat)?;
        let tx = self.transaction_store.save(tx).await?;
        self.dispatch(&tx).await?;

        info!(
            transaction_id = %tx.transaction_id(),
            amount = tx.amount(),
            vat = tx.vat(),
            installment = tx.installment(),
            "payment created"
        );
        Ok(PayReceipt::from(&tx))
    }

    /// Cancels part or all of the payment `transaction_id`.
    pub async fn cancel(&self, transaction_id: &str, request: CancelRequest) -> Result<CancelReceipt> {
        self.create_cancel(transaction_id, request)
            .await
            .inspect_err(|e| match e {
                PaymentError::ConflictError(_) => {
                    warn!(transaction_id, error = %e, "cancel lost a concurrent write")
                }
                _ => error!(transaction_id, error = %e, "error during cancel transaction"),
            })
    }

    async fn create_cancel(&self, transaction_id: &str, request: CancelRequest) -> Result<CancelReceipt> {
        let id = TransactionId::parse(transaction_id)?;
        let mut parent = self.load(&id).await?;
        let cancel = parent.request_cancel(request.amount, request.vat)?;

        // The CANCEL and the lowered parent balances commit together.
        let saved = self.transaction_store.save_all(vec![cancel, parent]).await?;
        let [cancel, parent]: [Transaction; 2] = saved
            .try_into()
            .map_err(|_| PaymentError::internal("store returned an unexpected batch"))?;
        self.dispatch(&cancel).await?;

        info!(
            transaction_id = %cancel.transaction_id(),
            parent_transaction_id = %parent.transaction_id(),
            amount = cancel.amount(),
            vat = cancel.vat(),
            remain_amount = parent.remain_amount(),
            remain_vat = parent.remain_vat(),
            "cancellation created"
        );
        Ok(CancelReceipt {
            transaction_id: cancel.transaction_id().clone(),
            parent_transaction_id: parent.transaction_id().clone(),
            created_at: cancel.created_at(),
            amount: cancel.amount(),
            vat: cancel.vat(),
            parent_remain_amount: parent.remain_amount(),
            parent_remain_vat: parent.remain_vat(),
        })
    }

    /// Looks up a record with its card data and, for a payment, its cancellations.
    pub async fn find(&self, transaction_id: &str) -> Result<TransactionView> {
        let id = TransactionId::parse(transaction_id)?;
        let tx = self.load(&id).await?;

        let cancellations = match tx.transaction_type() {
            TransactionType::Pay => self
                .transaction_store
                .find_cancellations(&id)
                .await?
                .into_iter()
                .map(view_without_children)
                .collect::<Result<Vec<_>>>()?,
            TransactionType::Cancel => Vec::new(),
        };

        let mut view = view_without_children(tx)?;
        view.cancellations = cancellations;
        Ok(view)
    }

    async fn load(&self, id: &TransactionId) -> Result<Transaction> {
        self.transaction_store
            .find_by_transaction_id(id)
            .await?
            .ok_or_else(|| PaymentError::NotFoundError(format!("transactionId : {id}")))
    }

    async fn dispatch(&self, tx: &Transaction) -> Result<()> {
        debug!(transaction_id = %tx.transaction_id(), "sending settlement message");
        let accepted = self
            .settlement
            .send(tx.message())
            .await
            .map_err(|e| PaymentError::InternalError(Box::new(e)))?;
        if accepted {
            Ok(())
        } else {
            Err(PaymentError::internal(format!(
                "settlement counterpart rejected transaction {}",
                tx.transaction_id()
            )))
        }
    }
}

fn view_without_children(transaction: Transaction) -> Result<TransactionView> {
    let card = transaction.card_info()?;
    Ok(TransactionView {
        transaction,
        card,
        cancellations: Vec::new(),
    })
}
