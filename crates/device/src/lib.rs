use std::{io, time::Duration};

use thiserror::Error;
use utility::env;

pub mod packet;
pub mod tcp;

pub use tcp::TcpPacketListener;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("not connected")]
    NotConnected,
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// `host:port` of the radio bridge.
    pub address: String,
    pub retry_min: Duration,
    pub retry_max: Duration,
}

impl DeviceConfig {
    /// `None` if no device address is configured.
    pub fn from_env() -> Option<Self> {
        let address = env::var_or("DEVICE_ADDRESS", String::new());
        if address.is_empty() {
            return None;
        }
        let retry_min = env::var_or("DEVICE_RETRY_MIN_SECS", 1u64).max(1);
        let retry_max = env::var_or("DEVICE_RETRY_MAX_SECS", 60u64).max(retry_min);
        Some(Self {
            address,
            retry_min: Duration::from_secs(retry_min),
            retry_max: Duration::from_secs(retry_max),
        })
    }

    pub fn listener(self) -> TcpPacketListener {
        TcpPacketListener::new(self.address).with_backoff(self.retry_min, self.retry_max)
    }
}
