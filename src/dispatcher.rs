//! Sends every due catalogue entry in order: nonce sequencing, retry of
//! transient submission errors, receipt confirmation, and swap output chaining.

use crate::blockchain::ChainClient;
use crate::catalog::{SwapInput, TransactionSpec};
use crate::contracts::erc20::received_amount;
use crate::error::DispatchError;
use crate::nonce::NonceCounter;
use crate::output_store::OutputStore;
use crate::retry::{execute_with_retry, RetryConfig};
use crate::schedule::{due_specs, ScheduleSlot};
use crate::signer::{DispatchAttempt, TxSigner};
use crate::transaction_monitor::{TransactionReceipt, TransactionStatus};
use alloy::primitives::utils::format_units;
use alloy::primitives::{B256, U256};
use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub retry: RetryConfig,
    pub receipt_timeout: Duration,
    pub repeat_delay: Duration,
    pub spec_delay: Duration,
    pub swap_deadline: Duration,
    pub test_mode: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            receipt_timeout: Duration::from_secs(120),
            repeat_delay: Duration::from_secs(10),
            spec_delay: Duration::from_secs(5),
            swap_deadline: Duration::from_secs(600),
            test_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecOutcome {
    /// Every repeat was mined successfully.
    Completed { confirmed: u32 },
    /// Nothing was submitted.
    Skipped { reason: String },
    /// Stopped at the first failing repeat; earlier repeats stay confirmed.
    Failed { confirmed: u32, error: String },
}

impl fmt::Display for SpecOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecOutcome::Completed { confirmed } => write!(f, "completed ({} confirmed)", confirmed),
            SpecOutcome::Skipped { reason } => write!(f, "skipped: {}", reason),
            SpecOutcome::Failed { confirmed, error } => {
                write!(f, "failed after {} confirmed: {}", confirmed, error)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpecReport {
    pub name: String,
    pub matched_slot: Option<ScheduleSlot>,
    pub tx_hashes: Vec<B256>,
    pub outcome: SpecOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<SpecReport>,
    pub not_due: Vec<String>,
}

impl RunSummary {
    pub fn failed(&self) -> impl Iterator<Item = &SpecReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, SpecOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }
}

enum SwapAmount {
    Configured,
    Chained(U256),
    Unavailable(String),
}

/// Wall clock of one run, anchored at the instant the run was asked to evaluate.
#[derive(Clone, Copy)]
struct RunClock {
    started_at: DateTime<Utc>,
    started: Instant,
}

impl RunClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.started.elapsed()).unwrap_or_else(|_| TimeDelta::zero());
        self.started_at + elapsed
    }
}

pub struct Dispatcher {
    client: Arc<dyn ChainClient>,
    signer: Arc<dyn TxSigner>,
    catalog: Vec<TransactionSpec>,
    store: OutputStore,
    settings: DispatchSettings,
    nonce: Mutex<NonceCounter>,
}

impl Dispatcher {
    pub fn new(
        client: Arc<dyn ChainClient>,
        signer: Arc<dyn TxSigner>,
        catalog: Vec<TransactionSpec>,
        store: OutputStore,
        settings: DispatchSettings,
    ) -> Result<Self> {
        for spec in &catalog {
            spec.validate(settings.test_mode)?;
        }

        Ok(Self {
            client,
            signer,
            catalog,
            store,
            settings,
            nonce: Mutex::new(NonceCounter::new()),
        })
    }

    pub async fn run(&self) -> RunSummary {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> RunSummary {
        let clock = RunClock {
            started_at: now,
            started: Instant::now(),
        };
        let due = due_specs(&self.catalog, now, self.settings.test_mode);

        let not_due = self
            .catalog
            .iter()
            .filter(|spec| !due.iter().any(|d| d.spec.name == spec.name))
            .map(|spec| spec.name.clone())
            .collect();

        info!(
            "📋 {} of {} transactions due at {}{}",
            due.len(),
            self.catalog.len(),
            now.format("%H:%M UTC"),
            if self.settings.test_mode { " (test mode)" } else { "" }
        );

        let mut reports = Vec::with_capacity(due.len());
        for (index, due_spec) in due.iter().enumerate() {
            if index > 0 {
                sleep(self.settings.spec_delay).await;
            }
            let report = self
                .dispatch_spec(due_spec.spec, due_spec.matched_slot, clock)
                .await;
            info!("📊 {}: {}", report.name, report.outcome);
            reports.push(report);
        }

        RunSummary { reports, not_due }
    }

    async fn dispatch_spec(
        &self,
        spec: &TransactionSpec,
        matched_slot: Option<ScheduleSlot>,
        clock: RunClock,
    ) -> SpecReport {
        let mut report = SpecReport {
            name: spec.name.clone(),
            matched_slot,
            tx_hashes: Vec::new(),
            outcome: SpecOutcome::Skipped {
                reason: String::new(),
            },
        };

        info!(
            "🚀 {} [{}] x{} (slot {})",
            spec.name,
            spec.kind,
            spec.repeat_count,
            matched_slot.map(|s| s.key()).unwrap_or_else(|| "-".to_string())
        );

        let input_amount = match self.resolve_swap_amount(spec, matched_slot) {
            Ok(SwapAmount::Configured) => None,
            Ok(SwapAmount::Chained(amount)) => Some(amount),
            Ok(SwapAmount::Unavailable(reason)) => {
                warn!("⏭️ Skipping {}: {}", spec.name, reason);
                report.outcome = SpecOutcome::Skipped { reason };
                return report;
            }
            Err(e) => {
                error!("❌ {}: {}", spec.name, e);
                report.outcome = SpecOutcome::Failed {
                    confirmed: 0,
                    error: e.to_string(),
                };
                return report;
            }
        };

        let mut confirmed = 0;
        for repeat in 1..=spec.repeat_count {
            if repeat > 1 {
                sleep(self.settings.repeat_delay).await;
            }

            match self.send_and_confirm(spec, input_amount, repeat, clock).await {
                Ok(receipt) => {
                    confirmed += 1;
                    report.tx_hashes.push(receipt.hash);

                    if spec.kind.produces_chained_output() {
                        if let Err(e) = self.record_output(spec, matched_slot, &receipt) {
                            error!("❌ Could not record swap output: {}", e);
                            report.outcome = SpecOutcome::Failed {
                                confirmed,
                                error: e.to_string(),
                            };
                            return report;
                        }
                    }
                }
                Err((tx_hash, error)) => {
                    error!("❌ {} #{} failed: {}", spec.name, repeat, error);
                    report.tx_hashes.extend(tx_hash);
                    report.outcome = SpecOutcome::Failed { confirmed, error };
                    return report;
                }
            }
        }

        report.outcome = SpecOutcome::Completed { confirmed };
        report
    }

    /// One repeat: submit with retry, then wait for the receipt. A mined
    /// failure or a missing receipt is final and never resubmitted.
    async fn send_and_confirm(
        &self,
        spec: &TransactionSpec,
        input_amount: Option<U256>,
        repeat: u32,
        clock: RunClock,
    ) -> std::result::Result<TransactionReceipt, (Option<B256>, String)> {
        let operation_name = format!("{} #{}/{}", spec.name, repeat, spec.repeat_count);

        let tx_hash = execute_with_retry(
            || self.submit_once(spec, input_amount, clock),
            &self.settings.retry,
            &operation_name,
        )
        .await
        .map_err(|e| (None, e.to_string()))?;

        info!("📤 {} sent: {:?}", operation_name, tx_hash);

        let receipt = self
            .client
            .wait_for_receipt(tx_hash, self.settings.receipt_timeout)
            .await
            .map_err(|e| (Some(tx_hash), e.to_string()))?;

        let failure = match receipt.status {
            TransactionStatus::Success => {
                info!(
                    "🎉 {} confirmed in block {} (gas used {})",
                    operation_name, receipt.block_number, receipt.gas_used
                );
                return Ok(receipt);
            }
            TransactionStatus::Failed => DispatchError::Reverted {
                tx_hash,
                block_number: receipt.block_number,
            },
            TransactionStatus::Timeout => DispatchError::ReceiptTimeout {
                tx_hash,
                waited: self.settings.receipt_timeout,
            },
        };
        Err((Some(tx_hash), failure.to_string()))
    }

    async fn submit_once(
        &self,
        spec: &TransactionSpec,
        input_amount: Option<U256>,
        clock: RunClock,
    ) -> std::result::Result<B256, DispatchError> {
        let mut nonce = self.nonce.lock().await;
        let current = nonce
            .acquire(self.client.as_ref(), self.signer.address())
            .await?;

        let deadline = clock.now().timestamp().max(0) as u64 + self.settings.swap_deadline.as_secs();
        let data = spec
            .call_data(input_amount, deadline)
            .map_err(|e| DispatchError::Encoding(e.to_string()))?;

        let attempt = DispatchAttempt {
            to: spec.target,
            value: spec.value,
            gas_limit: spec.gas_limit,
            data,
            nonce: current,
        };
        let signed = self.signer.sign(&attempt).await?;

        match self.client.submit(signed).await {
            Ok(tx_hash) => {
                nonce.advance();
                Ok(tx_hash)
            }
            Err(e) => {
                nonce.invalidate();
                Err(e)
            }
        }
    }

    fn resolve_swap_amount(
        &self,
        spec: &TransactionSpec,
        matched_slot: Option<ScheduleSlot>,
    ) -> std::result::Result<SwapAmount, DispatchError> {
        let Some(swap) = spec.swap.as_ref() else {
            return Ok(SwapAmount::Configured);
        };
        if !matches!(swap.input, SwapInput::Chained { .. }) {
            return Ok(SwapAmount::Configured);
        }

        let Some(key) = swap.input.source_key(matched_slot, self.settings.test_mode) else {
            return Ok(SwapAmount::Unavailable(format!(
                "no chained input mapped for slot {}",
                matched_slot.map(|s| s.key()).unwrap_or_else(|| "-".to_string())
            )));
        };

        let Some(raw) = self.store.get(key)? else {
            return Ok(SwapAmount::Unavailable(format!("no output recorded under {}", key)));
        };

        match U256::from_str(raw.trim()) {
            Ok(amount) if amount.is_zero() => Ok(SwapAmount::Unavailable(format!(
                "output recorded under {} is zero",
                key
            ))),
            Ok(amount) => {
                info!(
                    "🔗 Chained input from {}: {} ({})",
                    key,
                    amount,
                    display_amount(amount, swap.input_decimals)
                );
                Ok(SwapAmount::Chained(amount))
            }
            Err(_) => {
                warn!("⚠️ Output stored under {} is not a number: {:?}", key, raw);
                Ok(SwapAmount::Unavailable(format!(
                    "output recorded under {} is not a number",
                    key
                )))
            }
        }
    }

    fn record_output(
        &self,
        spec: &TransactionSpec,
        matched_slot: Option<ScheduleSlot>,
        receipt: &TransactionReceipt,
    ) -> std::result::Result<(), DispatchError> {
        let Some(swap) = spec.swap.as_ref() else {
            return Ok(());
        };
        let Some(slot) = matched_slot.or_else(|| spec.schedule.first().copied()) else {
            warn!("⚠️ {} has no slot to record its output under", spec.name);
            return Ok(());
        };

        let amount = match received_amount(&receipt.logs, swap.output_token, swap.recipient) {
            Some(amount) => amount,
            None => {
                warn!(
                    "⚠️ No Transfer of {} to {} in {:?}, recording 0",
                    swap.output_token, swap.recipient, receipt.hash
                );
                U256::ZERO
            }
        };

        info!(
            "💾 Recording output {} ({}) under {}",
            amount,
            display_amount(amount, swap.output_decimals),
            slot.key()
        );
        self.store.record(&slot.key(), amount)
    }
}

fn display_amount(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}
