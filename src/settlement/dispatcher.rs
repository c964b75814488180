//! Background anchoring of confirmed payments on the settlement registry.
//!
//! One job per confirmed payment, delivered at least once. Jobs for different
//! payments run in parallel and never affect each other. A failed registry
//! call is retried on a fixed delay up to the policy's attempt cap, then the
//! job is dead-lettered. The ledger is never rolled back by a settlement
//! failure.

use crate::core::constants::{SETTLEMENT_DEAD_LETTERED, SETTLEMENT_RECORDED, SETTLEMENT_SKIPPED};
use crate::core::errors::LedgerError;
use crate::core::models::{
    Payment, PaymentId, PaymentStatus, SettlementProof, SettlementRecord, SettlementStatus, UserId,
    WalletAddress,
};
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::registry::{RegistryError, SettlementRegistry};
use crate::infrastructure::storage::Storage;
use crate::settlement::hash::{SettlementHash, settlement_hash, to_minor_units};
use crate::settlement::queue::SettlementReceiver;
use crate::settlement::retry::RetryPolicy;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    PaymentNotFound,
    NotConfirmed,
    RegistryUnconfigured,
    MissingWallet,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettlementOutcome {
    Recorded(SettlementProof),
    /// A proof already existed; nothing was submitted.
    AlreadyRecorded(SettlementProof),
    Skipped(SkipReason),
    DeadLettered { attempts: u32, last_error: String },
    /// Shutdown arrived while waiting to retry.
    Abandoned { attempts: u32 },
    /// The settlement record could not be read or written.
    BookkeepingFailed(String),
}

struct Submission {
    payer: WalletAddress,
    payee: WalletAddress,
    amount_minor_units: u128,
    hash: SettlementHash,
}

pub struct SettlementDispatcher<S: Storage, R: SettlementRegistry, L: LoggingService> {
    storage: Arc<S>,
    registry: Option<Arc<R>>,
    logging: Arc<L>,
    policy: RetryPolicy,
    decimals: u32,
}

impl<S, R, L> SettlementDispatcher<S, R, L>
where
    S: Storage + 'static,
    R: SettlementRegistry + 'static,
    L: LoggingService + 'static,
{
    /// `registry` is `None` when the registry is not configured; every job
    /// then ends as pending configuration.
    pub fn new(storage: Arc<S>, registry: Option<Arc<R>>, logging: Arc<L>, policy: RetryPolicy, decimals: u32) -> Self {
        SettlementDispatcher {
            storage,
            registry,
            logging,
            policy,
            decimals,
        }
    }

    /// Runs the worker loop until the queue closes or shutdown is signalled,
    /// then waits for in-flight jobs to finish or abandon their retries.
    pub fn spawn(self: Arc<Self>, mut jobs: SettlementReceiver, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(max_attempts = self.policy.max_attempts, "settlement dispatcher started");
            let mut in_flight = JoinSet::new();
            loop {
                tokio::select! {
                    job = jobs.recv() => match job {
                        Some(job) => {
                            let dispatcher = self.clone();
                            let stop = shutdown.clone();
                            in_flight.spawn(async move { dispatcher.process(job.payment_id, stop).await });
                        }
                        None => break,
                    },
                    _ = stop_requested(&mut shutdown) => break,
                    Some(done) = in_flight.join_next(), if !in_flight.is_empty() => {
                        if let Err(e) = done {
                            error!(error = %e, "settlement task panicked");
                        }
                    }
                }
            }
            while let Some(done) = in_flight.join_next().await {
                if let Err(e) = done {
                    error!(error = %e, "settlement task panicked");
                }
            }
            info!("settlement dispatcher stopped");
        })
    }

    /// Settles one payment, retrying as the policy allows.
    pub async fn process(&self, payment_id: PaymentId, mut shutdown: watch::Receiver<bool>) -> SettlementOutcome {
        match self.run(payment_id, &mut shutdown).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%payment_id, error = %e, "settlement bookkeeping failed");
                SettlementOutcome::BookkeepingFailed(e.to_string())
            }
        }
    }

    async fn run(
        &self,
        payment_id: PaymentId,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SettlementOutcome, LedgerError> {
        let (payment, payer_wallet, payee_wallet, existing) = match self.load(payment_id).await? {
            Some(loaded) => loaded,
            None => {
                warn!(%payment_id, "settlement job for unknown payment");
                return Ok(SettlementOutcome::Skipped(SkipReason::PaymentNotFound));
            }
        };

        if payment.status != PaymentStatus::Confirmed {
            warn!(%payment_id, status = %payment.status, "settlement job for unconfirmed payment");
            return Ok(SettlementOutcome::Skipped(SkipReason::NotConfirmed));
        }
        if let Some(proof) = existing.and_then(|r| r.proof) {
            debug!(%payment_id, "payment already anchored");
            return Ok(SettlementOutcome::AlreadyRecorded(proof));
        }

        let Some(registry) = self.registry.as_ref() else {
            info!(%payment_id, "settlement registry not configured, skipping");
            self.skip(payment_id, SettlementStatus::PendingConfiguration).await?;
            return Ok(SettlementOutcome::Skipped(SkipReason::RegistryUnconfigured));
        };
        let (Some(payer), Some(payee)) = (payer_wallet, payee_wallet) else {
            info!(%payment_id, "payment parties lack wallet addresses, skipping");
            self.skip(payment_id, SettlementStatus::MissingWallet).await?;
            return Ok(SettlementOutcome::Skipped(SkipReason::MissingWallet));
        };

        let amount_minor_units = match to_minor_units(payment.amount, self.decimals) {
            Ok(units) => units,
            Err(e) => return self.dead_letter(payment_id, 0, e.to_string()).await,
        };
        let submission = Submission {
            payer,
            payee,
            amount_minor_units,
            hash: settlement_hash(&payer, &payee, amount_minor_units, payment_id),
        };

        let mut attempts = 0;
        loop {
            if *shutdown.borrow() {
                return Ok(SettlementOutcome::Abandoned { attempts });
            }
            attempts += 1;

            let error = match self.submit(registry.as_ref(), &submission).await {
                Ok(transaction_hash) => {
                    let proof = SettlementProof {
                        payment_id,
                        settlement_hash: submission.hash.to_string(),
                        transaction_hash,
                        timestamp: Utc::now(),
                    };
                    return self.record_proof(proof, attempts).await;
                }
                Err(e) => e,
            };

            warn!(
                %payment_id,
                attempt = attempts,
                max_attempts = self.policy.max_attempts,
                transient = error.is_transient(),
                %error,
                "settlement submission failed"
            );
            self.note_failure(payment_id, attempts, &error).await?;

            match self.policy.delay_after(attempts) {
                Some(delay) => {
                    if wait_or_cancel(delay, shutdown).await {
                        info!(%payment_id, attempts, "settlement retry abandoned on shutdown");
                        return Ok(SettlementOutcome::Abandoned { attempts });
                    }
                }
                None => return self.dead_letter(payment_id, attempts, error.to_string()).await,
            }
        }
    }

    async fn load(
        &self,
        payment_id: PaymentId,
    ) -> Result<Option<(Payment, Option<WalletAddress>, Option<WalletAddress>, Option<SettlementRecord>)>, LedgerError> {
        self.storage
            .read(move |state| {
                let payment = state.payments.get(&payment_id)?.clone();
                let wallet = |id: UserId| state.users.get(&id).and_then(|u| u.wallet_address);
                let payer = wallet(payment.from_user_id);
                let payee = wallet(payment.to_user_id);
                let record = state.settlements.get(&payment_id).cloned();
                Some((payment, payer, payee, record))
            })
            .await
    }

    async fn submit(&self, registry: &R, submission: &Submission) -> Result<String, RegistryError> {
        let receipt = registry
            .record_settlement(
                &submission.payer,
                &submission.payee,
                submission.amount_minor_units,
                &submission.hash,
            )
            .await?;
        if !receipt.success {
            return Err(RegistryError::Reverted(receipt.transaction_hash));
        }
        Ok(receipt.transaction_hash)
    }

    async fn record_proof(&self, proof: SettlementProof, attempts: u32) -> Result<SettlementOutcome, LedgerError> {
        let payment_id = proof.payment_id;
        let candidate = proof.clone();
        let (stored, fresh) = self
            .storage
            .transaction(move |state| {
                let record = state
                    .settlements
                    .entry(payment_id)
                    .or_insert_with(|| SettlementRecord::queued(payment_id));
                if let Some(existing) = &record.proof {
                    return Ok((existing.clone(), false));
                }
                record.status = SettlementStatus::Recorded;
                record.attempts = attempts;
                record.last_error = None;
                record.proof = Some(candidate.clone());
                record.updated_at = Utc::now();
                Ok((candidate, true))
            })
            .await?;

        if !fresh {
            debug!(%payment_id, "concurrent delivery already stored the proof");
            return Ok(SettlementOutcome::AlreadyRecorded(stored));
        }
        info!(
            %payment_id,
            settlement_hash = %stored.settlement_hash,
            transaction_hash = %stored.transaction_hash,
            attempts,
            "settlement recorded"
        );
        self.logging
            .log_action(
                SETTLEMENT_RECORDED,
                json!({
                    "payment_id": payment_id,
                    "settlement_hash": stored.settlement_hash,
                    "transaction_hash": stored.transaction_hash,
                    "attempts": attempts
                }),
                None,
            )
            .await?;
        Ok(SettlementOutcome::Recorded(stored))
    }

    async fn skip(&self, payment_id: PaymentId, status: SettlementStatus) -> Result<(), LedgerError> {
        self.storage
            .transaction(move |state| {
                let record = state
                    .settlements
                    .entry(payment_id)
                    .or_insert_with(|| SettlementRecord::queued(payment_id));
                record.status = status;
                record.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        self.logging
            .log_action(
                SETTLEMENT_SKIPPED,
                json!({ "payment_id": payment_id, "status": status }),
                None,
            )
            .await
    }

    async fn note_failure(&self, payment_id: PaymentId, attempts: u32, error: &RegistryError) -> Result<(), LedgerError> {
        let message = error.to_string();
        self.storage
            .transaction(move |state| {
                let record = state
                    .settlements
                    .entry(payment_id)
                    .or_insert_with(|| SettlementRecord::queued(payment_id));
                record.attempts = attempts;
                record.last_error = Some(message);
                record.updated_at = Utc::now();
                Ok(())
            })
            .await
    }

    async fn dead_letter(
        &self,
        payment_id: PaymentId,
        attempts: u32,
        last_error: String,
    ) -> Result<SettlementOutcome, LedgerError> {
        error!(%payment_id, attempts, %last_error, "settlement dead-lettered, manual intervention required");
        let message = last_error.clone();
        self.storage
            .transaction(move |state| {
                let record = state
                    .settlements
                    .entry(payment_id)
                    .or_insert_with(|| SettlementRecord::queued(payment_id));
                record.status = SettlementStatus::DeadLettered;
                record.attempts = attempts;
                record.last_error = Some(message);
                record.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        self.logging
            .log_action(
                SETTLEMENT_DEAD_LETTERED,
                json!({ "payment_id": payment_id, "attempts": attempts, "last_error": last_error }),
                None,
            )
            .await?;
        Ok(SettlementOutcome::DeadLettered { attempts, last_error })
    }
}

/// Sleeps for `delay`; returns `true` if shutdown was signalled first.
async fn wait_or_cancel(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = stop_requested(shutdown) => true,
    }
}

/// Resolves once shutdown is signalled. Pends forever if the sender is gone.
pub(crate) async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let closed = shutdown.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}
