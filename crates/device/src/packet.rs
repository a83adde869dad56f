//! Packets as emitted by the radio bridge, one JSON object per line:
//!
//! ```json
//! {"from": 2882400001, "decoded": {"portnum": "TEXT_MESSAGE_APP", "text": "12:34 PM\n37.1,-122.2"}}
//! ```
//!
//! Only the text payload is of interest. Telemetry, position and routing
//! packets carry no `decoded.text` and are skipped.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Decoded {
    pub portnum: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Packet {
    pub from: Option<u64>,
    pub decoded: Option<Decoded>,
}

impl Packet {
    pub fn into_text(self) -> Option<String> {
        self.decoded
            .and_then(|decoded| decoded.text)
            .filter(|text| !text.is_empty())
    }
}

/// Extracts the text payload of one line, if it has one.
pub fn text_of(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<Packet>(line) {
        Ok(packet) => packet.into_text(),
        Err(why) => {
            log::debug!("skipping malformed packet {:?}: {}", line, why);
            None
        }
    }
}
