// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

use crate::helper::{self, AlwaysTransient, Recorder};
use cdb_registry::{
    cdb::{
        codec::JsonCodec, consumer::CdbRegistryHandler, producer::CdbRegistryProducer,
        registry::CdbRegistry, topology::FixedIncomeTopology,
    },
    dispatcher::RabbitMQDispatcher,
    messaging::dispatcher::Dispatcher,
    publisher::{JSON_CONTENT_TYPE, RabbitMQPublisher},
};
use lapin::{options::BasicPublishOptions, types::ShortString, BasicProperties};
use opentelemetry::Context;
use std::{
    sync::{atomic::Ordering, Arc},
    time::Duration,
};
use tokio::{sync::oneshot, time::timeout};

#[tokio::test]
async fn consumes_in_publish_order() {
    let cfg = helper::configs("order");
    let topology = FixedIncomeTopology::from_configs(&cfg);
    let conn = helper::connect(&cfg).await;

    topology.install(conn.channel()).await.unwrap();

    let (recorder, mut received) = Recorder::new();
    let dispatcher = RabbitMQDispatcher::new(conn.channel(), vec![topology.queue.clone()], topology.dispatch)
        .subscribe(topology.queue_name(), CdbRegistryHandler::new(Arc::new(recorder)));

    let (stop, stopped) = oneshot::channel::<()>();
    let consuming = tokio::spawn(async move {
        dispatcher
            .consume_until(Box::pin(async move {
                let _ = stopped.await;
            }))
            .await
    });

    let producer = CdbRegistryProducer::new(RabbitMQPublisher::new(conn.channel()), &topology);
    let first = CdbRegistry::new("R1", "C1", 1000.0, 365, 12.5).unwrap();
    let second = CdbRegistry::new("R2", "C1", 250.0, 90, 10.0).unwrap();
    producer.publish(&Context::new(), &first).await.unwrap();
    producer.publish(&Context::new(), &second).await.unwrap();

    let got_first = timeout(Duration::from_secs(5), received.recv()).await.unwrap();
    let got_second = timeout(Duration::from_secs(5), received.recv()).await.unwrap();
    assert_eq!(got_first, Some(first));
    assert_eq!(got_second, Some(second));

    // Exactly one delivery each.
    assert!(timeout(Duration::from_millis(500), received.recv()).await.is_err());

    let _ = stop.send(());
    consuming.await.unwrap().unwrap();

    helper::cleanup(&conn.channel(), &topology).await;
    conn.close().await.unwrap();
}

#[tokio::test]
async fn malformed_payloads_go_to_the_dlq() {
    let cfg = helper::configs("dlq");
    let topology = FixedIncomeTopology::from_configs(&cfg);
    let conn = helper::connect(&cfg).await;
    let channel = conn.channel();

    topology.install(channel.clone()).await.unwrap();

    let (recorder, mut received) = Recorder::new();
    let dispatcher = RabbitMQDispatcher::new(channel.clone(), vec![topology.queue.clone()], topology.dispatch)
        .subscribe(topology.queue_name(), CdbRegistryHandler::new(Arc::new(recorder)));

    let (stop, stopped) = oneshot::channel::<()>();
    let consuming = tokio::spawn(async move {
        dispatcher
            .consume_until(Box::pin(async move {
                let _ = stopped.await;
            }))
            .await
    });

    let payload = br#"{"registryId":"R1","clientId":"C1","amount":"lots"}"#;
    channel
        .basic_publish(
            topology.exchange_name(),
            topology.routing_key(),
            BasicPublishOptions::default(),
            payload,
            BasicProperties::default().with_content_type(ShortString::from(JSON_CONTENT_TYPE)),
        )
        .await
        .unwrap()
        .await
        .unwrap();

    let dlq = topology.queue.dlq_name().unwrap().to_owned();
    let dead = helper::get(&channel, &dlq).await.unwrap();
    assert_eq!(dead, payload.to_vec());
    assert!(timeout(Duration::from_millis(200), received.recv()).await.is_err());

    let _ = stop.send(());
    consuming.await.unwrap().unwrap();

    helper::cleanup(&channel, &topology).await;
    conn.close().await.unwrap();
}

#[tokio::test]
async fn transient_failures_retry_then_land_in_the_dlq() {
    // One retry through `<queue>-retry` with a 100ms TTL.
    let cfg = helper::configs("retry");
    assert_eq!((cfg.consumer.retries, cfg.consumer.retry_ttl_ms), (1, 100));

    let topology = FixedIncomeTopology::from_configs(&cfg);
    let conn = helper::connect(&cfg).await;
    let channel = conn.channel();

    topology.install(channel.clone()).await.unwrap();

    let listener = Arc::new(AlwaysTransient::default());
    let dispatcher = RabbitMQDispatcher::new(channel.clone(), vec![topology.queue.clone()], topology.dispatch)
        .subscribe(topology.queue_name(), CdbRegistryHandler::new(listener.clone()));

    let (stop, stopped) = oneshot::channel::<()>();
    let consuming = tokio::spawn(async move {
        dispatcher
            .consume_until(Box::pin(async move {
                let _ = stopped.await;
            }))
            .await
    });

    let producer = CdbRegistryProducer::new(RabbitMQPublisher::new(channel.clone()), &topology);
    let registry = CdbRegistry::new("R1", "C1", 1000.0, 365, 12.5).unwrap();
    producer.publish(&Context::new(), &registry).await.unwrap();

    let dlq = topology.queue.dlq_name().unwrap().to_owned();
    let dead = helper::get_within(&channel, &dlq, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(JsonCodec.decode(&dead).unwrap(), registry);
    assert_eq!(listener.attempts.load(Ordering::SeqCst), 2);
    assert!(helper::get(&channel, topology.queue_name()).await.is_none());

    let _ = stop.send(());
    consuming.await.unwrap().unwrap();

    helper::cleanup(&channel, &topology).await;
    conn.close().await.unwrap();
}
