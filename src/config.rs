//! Configuration for RDD
//!
//! Centralized client configuration with sensible defaults.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{RddError, Result};
use crate::transport::Transport;

/// Configuration for a [`DeviceDriverClient`](crate::DeviceDriverClient)
#[derive(Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------
    /// Extension channel to the remote board (required)
    pub transport: Option<Arc<dyn Transport>>,

    // -------------------------------------------------------------------------
    // Request Handling
    // -------------------------------------------------------------------------
    /// Deadline for each request, measured from submission (milliseconds).
    /// Time spent waiting for an earlier request to finish counts against it.
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: None,
            request_timeout_ms: 5000,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("transport", &self.transport.as_ref().map(|_| "<transport>"))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check required fields and value ranges
    pub fn validate(&self) -> Result<()> {
        if self.transport.is_none() {
            return Err(RddError::MissingTransport);
        }
        if self.request_timeout_ms == 0 {
            return Err(RddError::Config(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    /// Set the request timeout (in milliseconds)
    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.request_timeout_ms = ms;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
