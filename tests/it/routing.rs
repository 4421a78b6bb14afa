// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

use crate::helper;
use cdb_registry::{
    cdb::{
        codec::JsonCodec, producer::CdbRegistryProducer, registry::CdbRegistry,
        topology::FixedIncomeTopology,
    },
    publisher::RabbitMQPublisher,
};
use lapin::{
    options::{QueueBindOptions, QueueDeclareOptions, QueueDeleteOptions},
    types::FieldTable,
};
use opentelemetry::Context;

#[tokio::test]
async fn delivers_only_to_the_queue_bound_with_the_key() {
    let cfg = helper::configs("routing");
    let topology = FixedIncomeTopology::from_configs(&cfg);
    let conn = helper::connect(&cfg).await;
    let channel = conn.channel();

    topology.install(channel.clone()).await.unwrap();

    let other = format!("{}.other", topology.queue_name());
    channel
        .queue_declare(&other, QueueDeclareOptions::default(), FieldTable::default())
        .await
        .unwrap();
    channel
        .queue_bind(
            &other,
            topology.exchange_name(),
            "some.other.key",
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .unwrap();

    let producer = CdbRegistryProducer::new(RabbitMQPublisher::new(channel.clone()), &topology);
    let registry = CdbRegistry::new("R1", "C1", 1000.0, 365, 12.5).unwrap();
    producer.publish(&Context::new(), &registry).await.unwrap();

    let data = helper::get(&channel, topology.queue_name()).await.unwrap();
    assert_eq!(JsonCodec.decode(&data).unwrap(), registry);
    assert!(helper::get(&channel, &other).await.is_none());

    let _ = channel.queue_delete(&other, QueueDeleteOptions::default()).await;
    helper::cleanup(&channel, &topology).await;
    conn.close().await.unwrap();
}

#[tokio::test]
async fn queue_is_declared_durable() {
    let cfg = helper::configs("durable");
    let topology = FixedIncomeTopology::from_configs(&cfg);
    let conn = helper::connect(&cfg).await;

    topology.install(conn.channel()).await.unwrap();

    // Redeclaring with other flags fails and closes the channel, so use a
    // dedicated connection for the probe.
    let probe = helper::connect(&cfg).await;
    let transient = probe
        .channel()
        .queue_declare(
            topology.queue_name(),
            QueueDeclareOptions {
                durable: false,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await;
    assert!(transient.is_err());
    let _ = probe.close().await;

    // Installing twice is idempotent.
    topology.install(conn.channel()).await.unwrap();

    helper::cleanup(&conn.channel(), &topology).await;
    conn.close().await.unwrap();
}
