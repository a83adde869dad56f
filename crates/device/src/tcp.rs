use std::time::Duration;

use async_trait::async_trait;
use coverage::listener::DeviceListener;
use tokio::{
    io::{AsyncBufReadExt as _, BufReader, Lines},
    net::TcpStream,
};

use crate::{packet, DeviceError};

/// Reads newline-delimited JSON packets from a radio bridge over TCP.
pub struct TcpPacketListener {
    address: String,
    lines: Option<Lines<BufReader<TcpStream>>>,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl TcpPacketListener {
    pub fn new<S: Into<String>>(address: S) -> Self {
        Self {
            address: address.into(),
            lines: None,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }
}

#[async_trait]
impl DeviceListener for TcpPacketListener {
    type Error = DeviceError;

    fn name(&self) -> String {
        format!("radio bridge {}", self.address)
    }

    async fn connect(&mut self) -> Result<(), DeviceError> {
        self.lines = None;
        let stream = TcpStream::connect(&self.address).await?;
        self.lines = Some(BufReader::new(stream).lines());
        Ok(())
    }

    async fn receive(&mut self) -> Result<Option<String>, DeviceError> {
        let lines = self.lines.as_mut().ok_or(DeviceError::NotConnected)?;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(text) = packet::text_of(&line) {
                        return Ok(Some(text));
                    }
                }
                Ok(None) => {
                    self.lines = None;
                    return Ok(None);
                }
                Err(why) => {
                    self.lines = None;
                    return Err(why.into());
                }
            }
        }
    }

    fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    fn max_backoff(&self) -> Duration {
        self.max_backoff
    }
}
