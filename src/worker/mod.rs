//! Remote training worker.
//!
//! Expensive surrogate variants can be trained in a separate long-lived
//! process. The worker holds at most one model; the caller blocks on every
//! call and receives either a complete result or an error.
//!
//! The protocol is JSON over HTTP: each method has its own `POST` route
//! whose body is the request and whose reply is the response.
//!
//! ```text
//! POST /init     {"method":"init","config":{"variant":"neural",...}}
//!             -> {"reply":"initialized","kind":"neural"}
//! POST /apply    {"method":"apply","input":{...},"folds":5}
//!             -> {"reply":"trained","folds":[...]}
//! POST /predict  {"method":"predict","features":{...}}
//!             -> {"reply":"predicted","labels":[0,1,1]}
//! POST /restart  {"method":"restart"}
//!             -> {"reply":"cleared"}
//! ```

mod client;
mod protocol;
mod server;
mod state;

pub use client::WorkerClient;
pub use protocol::{Request, Response};
pub use server::{router, serve, ROUTES};
pub use state::Worker;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default worker host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default worker port.
pub const DEFAULT_PORT: u16 = 8000;

/// Where the worker listens and how long a client waits for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Per-call timeout in seconds; `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout_secs: None,
        }
    }
}

impl WorkerConfig {
    /// `host:port`.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Per-call timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
