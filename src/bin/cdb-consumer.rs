// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Subscribes to the fixed-income queue and logs every CDB registration until
//! interrupted.

use cdb_registry::{
    cdb::{consumer::CdbRegistryHandler, topology::FixedIncomeTopology},
    channel::AmqpConnection,
    configs::Configs,
    dispatcher::RabbitMQDispatcher,
    logging,
    messaging::dispatcher::Dispatcher,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "cdb-consumer")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long, value_name = "FILE", env = "CDB_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let cfg = Configs::load(args.config.as_deref())?;

    logging::init(&cfg.log.level);

    let topology = FixedIncomeTopology::from_configs(&cfg);
    let conn = AmqpConnection::open(&cfg).await?;

    topology.install(conn.channel()).await?;

    let dispatcher = RabbitMQDispatcher::new(
        conn.channel(),
        vec![topology.queue.clone()],
        topology.dispatch,
    )
    .subscribe(topology.queue_name(), CdbRegistryHandler::logging());

    let consumed = dispatcher
        .consume_until(Box::pin(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(error = err.to_string(), "failure to listen for ctrl-c");
                futures_util::future::pending::<()>().await;
            }
        }))
        .await;

    if let Err(err) = &consumed {
        error!(error = err.to_string(), "consumer stopped");
    }

    conn.close().await?;
    info!("cdb-consumer stopped");

    consumed.map_err(Into::into)
}
