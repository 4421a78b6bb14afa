// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

use cdb_registry::{
    cdb::{registry::CdbRegistry, topology::FixedIncomeTopology},
    channel::AmqpConnection,
    configs::Configs,
    messaging::handler::HandlerError,
    cdb::consumer::RegistryListener,
};
use lapin::{
    options::{BasicGetOptions, ExchangeDeleteOptions, QueueDeleteOptions},
    Channel,
};
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};
use tokio::sync::mpsc;

/// Configuration with names unique to one test, so tests can run in parallel.
pub fn configs(test: &str) -> Configs {
    let mut cfg = Configs::load(None).unwrap();
    let suffix = uuid::Uuid::new_v4();

    cfg.fixed_income.queue.name = format!("it.{test}.{suffix}");
    cfg.fixed_income.queue.exchange = format!("it.{test}.{suffix}.exchange");
    cfg.fixed_income.queue.routing_key = format!("it.{test}.created");
    cfg.consumer.retry_ttl_ms = 100;
    cfg.consumer.retries = 1;
    cfg
}

pub async fn connect(cfg: &Configs) -> AmqpConnection {
    AmqpConnection::open(cfg).await.unwrap()
}

/// Pops one message from `queue`, waiting up to a second for it to arrive.
pub async fn get(channel: &Channel, queue: &str) -> Option<Vec<u8>> {
    get_within(channel, queue, Duration::from_secs(1)).await
}

/// Pops one message from `queue`, polling every 100ms until `wait` elapsed.
pub async fn get_within(channel: &Channel, queue: &str, wait: Duration) -> Option<Vec<u8>> {
    let polls = (wait.as_millis() / 100).max(1);

    for _ in 0..polls {
        let msg = channel
            .basic_get(queue, BasicGetOptions { no_ack: true })
            .await
            .unwrap();

        if let Some(msg) = msg {
            return Some(msg.delivery.data);
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    None
}

pub async fn cleanup(channel: &Channel, topology: &FixedIncomeTopology) {
    let mut queues = vec![topology.queue_name().to_owned()];
    queues.extend(topology.queue.dlq_name().map(str::to_owned));
    queues.extend(topology.queue.retry_name().map(str::to_owned));

    for queue in queues {
        let _ = channel
            .queue_delete(&queue, QueueDeleteOptions::default())
            .await;
    }

    let _ = channel
        .exchange_delete(topology.exchange_name(), ExchangeDeleteOptions::default())
        .await;
}

/// Forwards every registration it sees to a channel.
pub struct Recorder {
    tx: mpsc::UnboundedSender<CdbRegistry>,
}

impl Recorder {
    pub fn new() -> (Recorder, mpsc::UnboundedReceiver<CdbRegistry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Recorder { tx }, rx)
    }
}

impl RegistryListener for Recorder {
    fn on_registry(&self, registry: &CdbRegistry) -> Result<(), HandlerError> {
        self.tx
            .send(registry.clone())
            .map_err(|err| HandlerError::Transient(err.to_string()))
    }
}

/// Fails every registration with a transient error and counts the attempts.
#[derive(Default)]
pub struct AlwaysTransient {
    pub attempts: AtomicUsize,
}

impl RegistryListener for AlwaysTransient {
    fn on_registry(&self, _registry: &CdbRegistry) -> Result<(), HandlerError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(HandlerError::Transient("downstream unavailable".into()))
    }
}
