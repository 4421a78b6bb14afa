// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Channel Management
//!
//! This module owns the broker connection. An [`AmqpConnection`] is opened once by
//! the composition root, hands out its channel to the publisher, the topology and
//! the dispatcher, and is closed explicitly on shutdown.

use crate::{configs::Configs, errors::AmqpError};
use lapin::{
    options::ConfirmSelectOptions, types::LongString, Channel, Connection, ConnectionProperties,
};
use std::sync::Arc;
use tracing::{debug, error, info};

const REPLY_SUCCESS: u16 = 200;

/// An open connection to RabbitMQ together with the channel used on it.
pub struct AmqpConnection {
    conn: Arc<Connection>,
    channel: Arc<Channel>,
}

impl AmqpConnection {
    /// Connects to the broker described by `cfg.rabbitmq` and creates a channel.
    ///
    /// When `cfg.publisher.confirms` is set the channel is switched to confirm
    /// mode so each publish waits for the broker's ack.
    ///
    /// # Errors
    /// * `AmqpError::ConnectionError` - the broker is unreachable or refused the login
    /// * `AmqpError::ChannelError` - the channel could not be created or configured
    pub async fn open(cfg: &Configs) -> Result<AmqpConnection, AmqpError> {
        let options = ConnectionProperties::default()
            .with_connection_name(LongString::from(cfg.app.name.clone()));

        debug!(
            host = %cfg.rabbitmq.host,
            port = cfg.rabbitmq.port,
            "creating amqp connection..."
        );
        let conn = match Connection::connect(&cfg.rabbitmq.uri(), options).await {
            Ok(c) => Ok(c),
            Err(err) => {
                error!(error = err.to_string(), "failure to connect");
                Err(AmqpError::ConnectionError {})
            }
        }?;
        debug!("amqp connected");

        debug!("creating amqp channel...");
        let channel = match conn.create_channel().await {
            Ok(c) => Ok(c),
            Err(err) => {
                error!(error = err.to_string(), "error to create the channel");
                Err(AmqpError::ChannelError {})
            }
        }?;

        if cfg.publisher.confirms {
            if let Err(err) = channel
                .confirm_select(ConfirmSelectOptions { nowait: false })
                .await
            {
                error!(error = err.to_string(), "error to enable publisher confirms");
                return Err(AmqpError::ChannelError {});
            }
        }
        debug!("channel created");

        info!(name = %cfg.app.name, "amqp connection opened");

        Ok(AmqpConnection {
            conn: Arc::new(conn),
            channel: Arc::new(channel),
        })
    }

    /// The shared channel.
    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    /// Closes the channel, then the connection.
    pub async fn close(self) -> Result<(), AmqpError> {
        if self.channel.status().connected() {
            if let Err(err) = self.channel.close(REPLY_SUCCESS, "shutdown").await {
                error!(error = err.to_string(), "error to close the channel");
                return Err(AmqpError::CloseError {});
            }
        }

        if self.conn.status().connected() {
            if let Err(err) = self.conn.close(REPLY_SUCCESS, "shutdown").await {
                error!(error = err.to_string(), "error to close the connection");
                return Err(AmqpError::CloseError {});
            }
        }

        info!("amqp connection closed");
        Ok(())
    }
}
