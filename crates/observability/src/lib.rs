use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dinchat_core::{ChatReply, ReplyOutcome};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    answered_total: AtomicU64,
    unconfigured_total: AtomicU64,
    unmatched_total: AtomicU64,
    blank_total: AtomicU64,
    rejected_total: AtomicU64,
    errors_total: AtomicU64,
    total_latency_micros: AtomicU64,
    intent_hits: RwLock<BTreeMap<String, u64>>,
    unconfigured_intents: RwLock<BTreeMap<String, u64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub answered_total: u64,
    pub fallback_total: u64,
    pub unconfigured_total: u64,
    pub unmatched_total: u64,
    pub blank_total: u64,
    pub rejected_total: u64,
    pub errors_total: u64,
    pub avg_latency_micros: f64,
    pub intent_hits: BTreeMap<String, u64>,
    /// Intents that matched but whose tenant had no reply configured.
    pub unconfigured_intents: BTreeMap<String, u64>,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_reply(&self, reply: &ChatReply, latency: Duration) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.total_latency_micros
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);

        let counter = match reply.outcome {
            ReplyOutcome::Answered => &self.answered_total,
            ReplyOutcome::Unconfigured => &self.unconfigured_total,
            ReplyOutcome::Unmatched => &self.unmatched_total,
            ReplyOutcome::Blank => &self.blank_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        metrics::counter!("dinchat_replies_total", "outcome" => reply.outcome.as_str())
            .increment(1);
        metrics::histogram!("dinchat_respond_latency_seconds").record(latency.as_secs_f64());

        if let Some(intent) = reply.intent.as_deref() {
            *self
                .intent_hits
                .write()
                .entry(intent.to_string())
                .or_default() += 1;
            metrics::counter!("dinchat_intent_hits_total", "intent" => intent.to_string())
                .increment(1);

            if reply.outcome == ReplyOutcome::Unconfigured {
                *self
                    .unconfigured_intents
                    .write()
                    .entry(intent.to_string())
                    .or_default() += 1;
            }
        }
    }

    /// Requests turned away before classification (rate limit, size).
    pub fn inc_rejected(&self, reason: &'static str) {
        self.rejected_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("dinchat_rejected_total", "reason" => reason).increment(1);
    }

    pub fn inc_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("dinchat_errors_total").increment(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_micros.load(Ordering::Relaxed);
        let answered = self.answered_total.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            answered_total: answered,
            fallback_total: requests.saturating_sub(answered),
            unconfigured_total: self.unconfigured_total.load(Ordering::Relaxed),
            unmatched_total: self.unmatched_total.load(Ordering::Relaxed),
            blank_total: self.blank_total.load(Ordering::Relaxed),
            rejected_total: self.rejected_total.load(Ordering::Relaxed),
            errors_total: self.errors_total.load(Ordering::Relaxed),
            avg_latency_micros: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
            intent_hits: self.intent_hits.read().clone(),
            unconfigured_intents: self.unconfigured_intents.read().clone(),
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,dinchat_api=info,dinchat_agents=info,dinchat_tenants=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
