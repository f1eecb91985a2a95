//! Windows push-notification (WNS) channel provisioning.
//!
//! A channel is requested from a primary provider and, if that fails, from a
//! single fallback provider. Channels expire; callers refresh them, this
//! module never schedules its own renewal.

pub mod commands;
mod launch_args;
mod wns;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use launch_args::parse_wns_launch_args;

use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "push_channel";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushChannel {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum PushChannelError {
    #[error("{provider} could not create a push channel: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("Push notifications are unavailable: the app must be installed from its Microsoft Store (MSIX) package to receive a notification channel")]
    PackagingRequired { causes: HashMap<&'static str, String> },
}

#[async_trait]
pub trait PushChannelProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn create_channel(&self) -> Result<PushChannel, PushChannelError>;
}

pub struct PushChannelProvisioner {
    primary: Box<dyn PushChannelProvider>,
    fallback: Box<dyn PushChannelProvider>,
}

impl PushChannelProvisioner {
    pub fn new(primary: Box<dyn PushChannelProvider>, fallback: Box<dyn PushChannelProvider>) -> Self {
        Self { primary, fallback }
    }

    /// Providers for the host this binary was built for.
    pub fn for_host() -> Self {
        let (primary, fallback) = wns::host_providers();
        Self::new(primary, fallback)
    }

    pub async fn provision(&self) -> Result<PushChannel, PushChannelError> {
        let primary_err = match self.primary.create_channel().await {
            Ok(channel) => return Ok(log_channel(self.primary.name(), channel)),
            Err(err) => err,
        };
        log_warn!(
            "{} failed ({primary_err}); trying {}",
            self.primary.name(),
            self.fallback.name()
        );

        let fallback_err = match self.fallback.create_channel().await {
            Ok(channel) => return Ok(log_channel(self.fallback.name(), channel)),
            Err(err) => err,
        };
        log_warn!("{} failed ({fallback_err})", self.fallback.name());

        Err(PushChannelError::PackagingRequired {
            causes: HashMap::from([
                (self.primary.name(), primary_err.to_string()),
                (self.fallback.name(), fallback_err.to_string()),
            ]),
        })
    }
}

fn log_channel(provider: &str, channel: PushChannel) -> PushChannel {
    match channel.expires_at {
        Some(expires_at) => log_info!("{provider} issued a channel expiring at {expires_at}"),
        None => log_info!("{provider} issued a channel"),
    }
    channel
}
