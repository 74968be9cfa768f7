//! Optional transaction/span instrumentation
//!
//! Events go to an [`InstrumentationSink`] when one is installed. Sink
//! failures are logged and dropped; recording behavior never depends on them.

use crate::config::MonitoringConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

pub const TRANSACTION_VIDEO_PROCESSING: &str = "Video Processing";
pub const SPAN_ASK_PERMISSION: &str = "Asking Permission";
pub const SPAN_TAKE_VIDEO: &str = "Take Video";
pub const TAG_INSPECTION_ID: &str = "inspectionId";

/// Final status of a transaction or span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringStatus {
    Ok,
    UnknownError,
    /// Cancelled by the user
    Cancelled,
    /// Aborted, typically because the operation could not proceed
    Aborted,
}

impl MonitoringStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitoringStatus::Ok => "ok",
            MonitoringStatus::UnknownError => "unknown_error",
            MonitoringStatus::Cancelled => "cancelled",
            MonitoringStatus::Aborted => "aborted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitoringEvent {
    TransactionStarted { id: Uuid, name: String },
    Tag { transaction: Uuid, key: String, value: String },
    SpanStarted { transaction: Uuid, op: String },
    SpanFinished { transaction: Uuid, op: String },
    TransactionFinished { id: Uuid, status: MonitoringStatus },
}

#[derive(Debug, thiserror::Error)]
pub enum MonitoringError {
    #[error("instrumentation sink unavailable: {0}")]
    Unavailable(String),
    #[error("instrumentation sink rejected event: {0}")]
    Rejected(String),
}

pub trait InstrumentationSink: Send + Sync {
    fn record(&self, event: MonitoringEvent) -> Result<(), MonitoringError>;
}

/// Sink that writes events to the log, at debug level unless verbose
#[derive(Debug)]
pub struct LogSink {
    level: log::Level,
}

impl LogSink {
    pub fn new() -> Self {
        Self {
            level: log::Level::Debug,
        }
    }

    /// Log events at info level
    pub fn verbose() -> Self {
        Self {
            level: log::Level::Info,
        }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl InstrumentationSink for LogSink {
    fn record(&self, event: MonitoringEvent) -> Result<(), MonitoringError> {
        log::log!(self.level, "monitoring: {:?}", event);
        Ok(())
    }
}

/// Front for an optional sink
#[derive(Clone)]
pub struct Monitor {
    sink: Option<Arc<dyn InstrumentationSink>>,
    custom_tags: BTreeMap<String, String>,
    sample_rate: f64,
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            sink: None,
            custom_tags: BTreeMap::new(),
            sample_rate: 1.0,
        }
    }
}

impl Monitor {
    pub fn new(sink: Arc<dyn InstrumentationSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::default()
        }
    }

    /// Monitor that discards everything
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Log-backed monitor when enabled in config, disabled otherwise
    pub fn from_config(config: &MonitoringConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        log::info!(
            "Monitoring enabled (environment {}, release {})",
            config.environment,
            config.release
        );
        if !config.dsn.is_empty() {
            log::info!("Monitoring DSN configured; events are written to the log only");
        }
        let sink = if config.debug {
            LogSink::verbose()
        } else {
            LogSink::new()
        };
        let mut tags = config.custom_tags.clone();
        tags.entry("environment".to_string())
            .or_insert_with(|| config.environment.clone());
        Self::new(Arc::new(sink))
            .with_custom_tags(tags)
            .with_sample_rate(config.traces_sample_rate)
    }

    /// Fraction of transactions recorded, clamped to `0.0..=1.0`
    pub fn with_sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        self
    }

    /// Tags added to every transaction
    pub fn with_custom_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.custom_tags = tags;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Start a transaction. Transactions not picked by the sample rate
    /// emit nothing.
    pub fn start_transaction(&self, name: &str) -> Transaction {
        let id = Uuid::new_v4();
        let monitor = if self.is_enabled() && sampled(id, self.sample_rate) {
            self.clone()
        } else {
            Self::disabled()
        };
        let transaction = Transaction {
            id,
            monitor,
            finished: false,
        };
        let monitor = &transaction.monitor;
        monitor.emit(MonitoringEvent::TransactionStarted {
            id: transaction.id,
            name: name.to_string(),
        });
        for (key, value) in &monitor.custom_tags {
            transaction.set_tag(key, value);
        }
        transaction
    }

    fn emit(&self, event: MonitoringEvent) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.record(event) {
                log::debug!("Dropping monitoring event: {}", e);
            }
        }
    }
}

/// The top 48 bits of a v4 UUID are random
fn sampled(id: Uuid, rate: f64) -> bool {
    if rate >= 1.0 {
        return true;
    }
    let draw = (id.as_u128() >> 80) as f64 / (1u64 << 48) as f64;
    draw < rate
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("enabled", &self.is_enabled())
            .field("custom_tags", &self.custom_tags)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

#[derive(Debug)]
pub struct Transaction {
    id: Uuid,
    monitor: Monitor,
    finished: bool,
}

impl Transaction {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn set_tag(&self, key: &str, value: &str) {
        self.monitor.emit(MonitoringEvent::Tag {
            transaction: self.id,
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    pub fn start_span(&self, op: &str) {
        self.monitor.emit(MonitoringEvent::SpanStarted {
            transaction: self.id,
            op: op.to_string(),
        });
    }

    pub fn finish_span(&self, op: &str) {
        self.monitor.emit(MonitoringEvent::SpanFinished {
            transaction: self.id,
            op: op.to_string(),
        });
    }

    pub fn finish(mut self, status: MonitoringStatus) {
        self.finished = true;
        self.monitor.emit(MonitoringEvent::TransactionFinished {
            id: self.id,
            status,
        });
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            self.monitor.emit(MonitoringEvent::TransactionFinished {
                id: self.id,
                status: MonitoringStatus::Cancelled,
            });
        }
    }
}
