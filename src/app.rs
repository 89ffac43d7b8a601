use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::cnpj_ws::LookupClient;
use crate::config::ResolvedConfig;
use crate::domain::Cnpj;
use crate::error::EnrichError;
use crate::error_log::ErrorLog;
use crate::store::Store;

pub const NO_DATA_MESSAGE: &str = "no data returned by the API";

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Suspends the run between batches of lookups.
pub trait Pacer {
    fn pause(&self, duration: Duration);
}

pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ItemOutcome {
    Stored,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub index: usize,
    pub cnpj: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub stored: usize,
    pub failed: usize,
    pub pauses: usize,
    pub items: Vec<ItemResult>,
}

pub struct App<L: LookupClient, P: Pacer> {
    store: Store,
    error_log: ErrorLog,
    lookup: L,
    pacer: P,
    batch_size: usize,
    pause: Duration,
}

impl<L: LookupClient, P: Pacer> App<L, P> {
    pub fn new(config: &ResolvedConfig, lookup: L, pacer: P) -> Self {
        Self {
            store: Store::new(config.database.clone()),
            error_log: ErrorLog::new(config.error_log.clone()),
            lookup,
            pacer,
            batch_size: config.batch_size.max(1),
            pause: config.pause,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Processes every identifier in order. Per-item failures are written to
    /// the error log and never stop the loop.
    pub fn run(&self, identifiers: &[Cnpj], sink: &dyn ProgressSink) -> RunSummary {
        let total = identifiers.len();
        let started = Instant::now();
        let mut items = Vec::with_capacity(total);
        let mut pauses = 0usize;

        for (index, cnpj) in identifiers.iter().enumerate() {
            let position = index + 1;
            sink.event(ProgressEvent {
                message: format!("processing {position}/{total}: {cnpj}"),
                elapsed: Some(started.elapsed()),
            });
            if !cnpj.is_well_formed() {
                tracing::warn!(%cnpj, "identifier is not 14 digits; processing anyway");
            }

            let outcome = match self.process(cnpj, sink) {
                Ok(()) => ItemOutcome::Stored,
                Err(reason) => {
                    sink.event(ProgressEvent {
                        message: format!("error processing {cnpj}: {reason}"),
                        elapsed: Some(started.elapsed()),
                    });
                    self.error_log.log(cnpj.as_str(), &reason);
                    ItemOutcome::Failed { reason }
                }
            };
            items.push(ItemResult {
                index: position,
                cnpj: cnpj.as_str().to_string(),
                outcome,
            });

            if position % self.batch_size == 0 {
                sink.event(ProgressEvent {
                    message: format!(
                        "rate limit: pausing {}s after {position} lookups",
                        self.pause.as_secs()
                    ),
                    elapsed: Some(started.elapsed()),
                });
                self.pacer.pause(self.pause);
                pauses += 1;
            }
        }

        let stored = items
            .iter()
            .filter(|item| item.outcome == ItemOutcome::Stored)
            .count();
        sink.event(ProgressEvent {
            message: format!("done: {stored} stored, {} failed", total - stored),
            elapsed: Some(started.elapsed()),
        });

        RunSummary {
            total,
            stored,
            failed: total - stored,
            pauses,
            items,
        }
    }

    fn process(&self, cnpj: &Cnpj, sink: &dyn ProgressSink) -> Result<(), String> {
        let record = match self.lookup.fetch(cnpj) {
            Ok(Some(record)) => record,
            Ok(None) => return Err(NO_DATA_MESSAGE.to_string()),
            Err(err) => return Err(err.to_string()),
        };

        self.store.upsert(&record).map_err(|err| err.to_string())?;
        tracing::info!(%cnpj, legal_name = %record.legal_name, "stored registry entry");

        match self.store.get(cnpj) {
            Ok(Some(row)) => {
                tracing::debug!(?row, "verified stored row");
                sink.event(ProgressEvent {
                    message: format!("stored {cnpj}: {}", row.legal_name),
                    elapsed: None,
                });
            }
            Ok(None) => {
                tracing::warn!(%cnpj, "stored row not found on verification");
            }
            Err(err) => {
                tracing::warn!(%cnpj, "verification read failed: {err}");
            }
        }
        Ok(())
    }
}

/// Ensures the schema exists before a run touches the store.
pub fn prepare_store(store: &Store) -> Result<(), EnrichError> {
    store.ensure_schema()?;
    tracing::debug!(path = %store.path(), "store schema ready");
    Ok(())
}
