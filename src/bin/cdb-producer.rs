// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Declares the fixed-income topology and publishes one CDB registration.

use cdb_registry::{
    cdb::{producer::CdbRegistryProducer, registry::CdbRegistry, topology::FixedIncomeTopology},
    channel::AmqpConnection,
    configs::Configs,
    errors::AmqpError,
    logging,
    messaging::errors::MessagingError,
    publisher::RabbitMQPublisher,
};
use clap::Parser;
use opentelemetry::Context;
use std::path::PathBuf;
use tracing::error;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "cdb-producer")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long, value_name = "FILE", env = "CDB_CONFIG")]
    config: Option<PathBuf>,

    /// Registry identifier, a random UUID when omitted
    #[arg(long)]
    registry_id: Option<String>,

    #[arg(long)]
    client_id: String,

    /// Monetary amount
    #[arg(long)]
    amount: f64,

    #[arg(long)]
    duration_days: u32,

    /// Interest rate in percent
    #[arg(long)]
    interest_rate: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let cfg = Configs::load(args.config.as_deref())?;

    logging::init(&cfg.log.level);

    let registry = CdbRegistry::new(
        args.registry_id
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        args.client_id,
        args.amount,
        args.duration_days,
        args.interest_rate,
    )?;

    let topology = FixedIncomeTopology::from_configs(&cfg);
    let conn = AmqpConnection::open(&cfg).await?;

    topology.install(conn.channel()).await?;

    let producer = CdbRegistryProducer::new(RabbitMQPublisher::new(conn.channel()), &topology);
    let published = producer.publish(&Context::current(), &registry).await;

    let closed = conn.close().await;

    outcome(published, closed)
}

/// A publish failure wins over a close failure; the latter is only logged then.
fn outcome(
    published: Result<(), MessagingError>,
    closed: Result<(), AmqpError>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let (Err(_), Err(err)) = (&published, &closed) {
        error!(error = err.to_string(), "failure to close the connection");
    }

    published?;
    closed?;

    Ok(())
}
