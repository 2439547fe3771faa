// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Acquires a connection to the embedded server, retrying through its
//! slow and flaky startup.
//!
//! The server often refuses the first few attachments after it is started.
//! Each attempt nudges the server, waits for it to settle, then connects;
//! every failure, expected or not, consumes one attempt.

use crate::config::DatabaseConfig;
use crate::domain::errors::{ExportError, Result};
use crate::ports::source_port::{ConnectParams, DatabaseConnector, SourceDatabase};
use log::{error, info, warn};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

pub struct ConnectionSupervisor {
    connector: Arc<dyn DatabaseConnector>,
    max_attempts: u32,
    settle_delay: Duration,
}

impl ConnectionSupervisor {
    pub fn new(connector: Arc<dyn DatabaseConnector>, max_attempts: u32, settle_delay: Duration) -> Self {
        Self {
            connector,
            max_attempts,
            settle_delay,
        }
    }

    pub fn from_config(connector: Arc<dyn DatabaseConnector>, config: &DatabaseConfig) -> Self {
        Self::new(connector, config.max_connect_attempts, config.settle_delay())
    }

    /// Returns an open connection, or `ConnectionExhausted` once the attempt
    /// budget is spent. Exhaustion means the server is unusable for every job.
    pub fn acquire(&self, params: &ConnectParams) -> Result<Box<dyn SourceDatabase>> {
        for attempt in 1..=self.max_attempts {
            self.connector.ensure_server_running();
            if !self.settle_delay.is_zero() {
                thread::sleep(self.settle_delay);
            }

            info!("Attempting connection... {}/{}", attempt, self.max_attempts);
            match self.connector.connect(params) {
                Ok(conn) => {
                    info!("Connected on attempt {}", attempt);
                    return Ok(conn);
                }
                Err(ExportError::DatabaseUnavailable(reason)) => {
                    warn!("Firebird not ready yet: {}", reason);
                }
                Err(e) => {
                    warn!("Unexpected connection failure: {:?}", e);
                }
            }
        }

        error!("Connection to Firebird failed after {} attempts", self.max_attempts);
        Err(ExportError::ConnectionExhausted {
            attempts: self.max_attempts,
        })
    }
}
