//! Forwarding of structured log events to a Loki collector.
//!
//! [`ForwardLayer`] turns this crate's tracing events into [`LogEvent`]s and
//! hands them to a bounded queue without waiting. [`LokiShipper`] drains the
//! queue in batches from a background task. When the queue is full events are
//! dropped and counted, so a slow or absent collector never stalls a request.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{warn, Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use super::log_throttle::LogThrottle;
use crate::config::LokiConfig;

const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");
const SHIPPER_TARGET: &str = module_path!();
const PUSH_PATH: &str = "/loki/api/v1/push";

/// One forwarded log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: String,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[derive(Default)]
struct LogEventVisitor {
    message: Option<String>,
    method: Option<String>,
    route: Option<String>,
    status: Option<u64>,
    stack: Option<String>,
}

impl LogEventVisitor {
    fn record_text(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            "method" => self.method = Some(value),
            "route" => self.route = Some(value),
            "stack" => self.stack = Some(value),
            _ => {}
        }
    }
}

impl Visit for LogEventVisitor {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "status" {
            self.status = Some(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if field.name() == "status" {
            self.status = u64::try_from(value).ok();
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_text(field, format!("{:?}", value));
    }
}

/// Shared count of events dropped because the queue was full.
#[derive(Clone, Debug, Default)]
pub struct DroppedEvents(Arc<AtomicU64>);

impl DroppedEvents {
    pub fn take(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }

    fn add(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

/// Tracing layer enqueueing this crate's events for the shipper.
#[derive(Clone)]
pub struct ForwardLayer {
    sender: mpsc::Sender<LogEvent>,
    max_level: LevelFilter,
    dropped: DroppedEvents,
}

impl ForwardLayer {
    pub fn new(sender: mpsc::Sender<LogEvent>, max_level: LevelFilter) -> Self {
        ForwardLayer {
            sender,
            max_level,
            dropped: DroppedEvents::default(),
        }
    }

    pub fn dropped(&self) -> DroppedEvents {
        self.dropped.clone()
    }

    fn forwards(&self, target: &str) -> bool {
        target.starts_with(CRATE_TARGET) && target != SHIPPER_TARGET
    }
}

impl<S: Subscriber> Layer<S> for ForwardLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > self.max_level || !self.forwards(metadata.target()) {
            return;
        }

        let mut visitor = LogEventVisitor::default();
        event.record(&mut visitor);

        let log_event = LogEvent {
            level: metadata.level().as_str().to_lowercase(),
            message: visitor
                .message
                .unwrap_or_else(|| metadata.name().to_string()),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            method: visitor.method,
            route: visitor.route,
            status: visitor.status,
            stack: visitor.stack,
        };

        if self.sender.try_send(log_event).is_err() {
            self.dropped.add();
        }
    }
}

/// Handle used to stop the shipper after a final flush.
pub struct ShipperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ShipperHandle {
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = self.task.await;
    }
}

/// Background task pushing batches of [`LogEvent`]s to Loki.
pub struct LokiShipper {
    client: reqwest::Client,
    push_url: String,
    labels: BTreeMap<String, String>,
    batch_size: usize,
    flush_interval: Duration,
    receiver: mpsc::Receiver<LogEvent>,
    dropped: DroppedEvents,
    throttle: LogThrottle,
}

/// Builds a connected layer/shipper pair from the Loki settings.
pub fn loki_pipeline(
    config: &LokiConfig,
    max_level: LevelFilter,
) -> Result<(ForwardLayer, LokiShipper), reqwest::Error> {
    let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
    let layer = ForwardLayer::new(sender, max_level);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let shipper = LokiShipper {
        client,
        push_url: format!("{}{}", config.url.trim_end_matches('/'), PUSH_PATH),
        labels: config.labels.clone(),
        batch_size: config.batch_size.max(1),
        flush_interval: Duration::from_millis(config.flush_interval_ms.max(1)),
        receiver,
        dropped: layer.dropped(),
        throttle: LogThrottle::new(Duration::from_secs(30)),
    };
    Ok((layer, shipper))
}

impl LokiShipper {
    pub fn spawn(self) -> ShipperHandle {
        let (shutdown, signal) = oneshot::channel();
        ShipperHandle {
            shutdown: Some(shutdown),
            task: tokio::spawn(self.run(signal)),
        }
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = self.receiver.recv() => match received {
                    Some(event) => {
                        batch.push(event);
                        if batch.len() >= self.batch_size {
                            self.flush(&mut batch).await;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => self.flush(&mut batch).await,
                _ = &mut shutdown => {
                    while let Ok(event) = self.receiver.try_recv() {
                        batch.push(event);
                    }
                    break;
                }
            }
        }

        self.flush(&mut batch).await;
    }

    async fn flush(&mut self, batch: &mut Vec<LogEvent>) {
        let dropped = self.dropped.take();
        if dropped > 0 {
            if let Some(suppressed) = self.throttle.should_emit("loki.queue") {
                warn!(dropped, suppressed, "Log queue full; events were dropped");
            }
        }
        if batch.is_empty() {
            return;
        }

        let payload = push_payload(&self.labels, batch);
        let result = self
            .client
            .post(&self.push_url)
            .json(&payload)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        if let Err(e) = result {
            if let Some(suppressed) = self.throttle.should_emit("loki.push") {
                warn!(
                    lost = batch.len(),
                    suppressed, "Failed to push logs to Loki: {}", e
                );
            }
        }
        batch.clear();
    }
}

/// Loki push body: one stream per level, values as `[<unix nanos>, <json line>]`.
fn push_payload(labels: &BTreeMap<String, String>, batch: &[LogEvent]) -> Value {
    let mut streams: BTreeMap<&str, Vec<[String; 2]>> = BTreeMap::new();
    for event in batch {
        let nanos = DateTime::parse_from_rfc3339(&event.timestamp)
            .ok()
            .and_then(|ts| ts.timestamp_nanos_opt())
            .unwrap_or_default();
        let line = serde_json::to_string(event).unwrap_or_else(|_| event.message.clone());
        streams
            .entry(event.level.as_str())
            .or_default()
            .push([nanos.to_string(), line]);
    }

    let streams: Vec<Value> = streams
        .into_iter()
        .map(|(level, values)| {
            let mut stream = labels.clone();
            stream.insert("level".to_string(), level.to_string());
            json!({ "stream": stream, "values": values })
        })
        .collect();
    json!({ "streams": streams })
}
