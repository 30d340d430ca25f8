use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::DateTime;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{error, info, warn};
use url::Url;

use crate::{
    events::Tick,
    feeds::channel::{ChannelFeed, TickProducer},
    market::market_source::{MarketFeed, TickStream},
    types::{instrument::InstrumentId, price::Price},
};

/// Tick as it appears on the wire.
#[derive(Debug, Deserialize)]
struct WireTick {
    instrument: u32,
    timestamp_ms: i64,
    last_price: f64,
    #[serde(default)]
    volume: u64,
    #[serde(default)]
    open_interest: Option<u64>,
}

impl WireTick {
    fn into_tick(self) -> Result<Tick> {
        let instrument = InstrumentId::new(self.instrument);
        let Some(timestamp) = DateTime::from_timestamp_millis(self.timestamp_ms) else {
            bail!("tick for {instrument} has timestamp out of range: {}", self.timestamp_ms);
        };
        let last_price = Price::try_new(self.last_price)
            .with_context(|| format!("tick for {instrument} has invalid last_price"))?;

        Ok(Tick {
            instrument,
            timestamp,
            last_price,
            volume: self.volume,
            open_interest: self.open_interest,
        })
    }
}

const TICK_FIELDS: [&str; 3] = ["instrument", "timestamp_ms", "last_price"];

fn carries_tick(candidate: &Value) -> bool {
    candidate
        .as_object()
        .is_some_and(|fields| TICK_FIELDS.iter().any(|key| fields.contains_key(*key)))
}

/// Decodes one text frame. A frame holds a single tick object or an array of
/// them. Frames without tick fields (acks, heartbeats) decode to no ticks; a
/// tick that does not decode or validate fails the whole frame.
pub fn parse_tick_frame(text: &str) -> Result<Vec<Tick>> {
    let Ok(parsed) = serde_json::from_str::<Value>(text) else {
        return Ok(Vec::new());
    };

    let candidates = match parsed {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => return Ok(Vec::new()),
    };

    candidates
        .into_iter()
        .filter(carries_tick)
        .map(|candidate| {
            serde_json::from_value::<WireTick>(candidate)
                .context("malformed tick on websocket feed")?
                .into_tick()
        })
        .collect()
}

fn subscription(instruments: &[InstrumentId]) -> Value {
    json!({
        "action": "subscribe",
        "instruments": instruments.iter().map(|id| id.token()).collect::<Vec<_>>(),
    })
}

/// Generic JSON websocket feed. A producer task owns the socket and pushes
/// decoded ticks through a [`ChannelFeed`].
#[derive(Debug)]
pub struct WebSocketFeed {
    url: Url,
    instruments: Vec<InstrumentId>,
    channel: ChannelFeed,
    producer: Option<TickProducer>,
    task: Option<JoinHandle<()>>,
}

impl WebSocketFeed {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            bail!("websocket feed needs a ws:// or wss:// url, got {url}");
        }

        let (channel, producer) = ChannelFeed::new();
        Ok(Self {
            url,
            instruments: Vec::new(),
            channel,
            producer: Some(producer),
            task: None,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn run_socket(
        url: Url,
        instruments: Vec<InstrumentId>,
        producer: &TickProducer,
    ) -> Result<()> {
        let (stream, _http_response) = connect_async(url.as_str()).await?;
        let (mut writer, mut reader) = stream.split();

        writer
            .send(Message::Text(subscription(&instruments).to_string()))
            .await?;

        info!(%url, instruments = instruments.len(), "Websocket feed connected");

        while let Some(message) = reader.next().await {
            let text = match message? {
                Message::Text(text) => text,
                Message::Binary(binary) => match String::from_utf8(binary) {
                    Ok(text) => text,
                    Err(_) => continue,
                },
                Message::Close(frame) => {
                    warn!(?frame, "Websocket feed closed by server");
                    bail!("websocket feed closed by server: {frame:?}");
                }
                _ => continue,
            };

            for tick in parse_tick_frame(&text)? {
                if producer.push(tick).is_err() {
                    // Consumer is gone.
                    return Ok(());
                }
            }
        }

        bail!("websocket feed ended without a close frame")
    }
}

#[async_trait]
impl MarketFeed for WebSocketFeed {
    async fn subscribe(&mut self, instruments: &[InstrumentId]) -> Result<()> {
        self.instruments.extend_from_slice(instruments);
        self.channel.subscribe(instruments).await
    }

    fn stream(&mut self) -> Result<TickStream> {
        let Some(producer) = self.producer.take() else {
            bail!("websocket feed stream already taken");
        };
        let stream = self.channel.stream()?;

        let url = self.url.clone();
        let instruments = self.instruments.clone();
        self.task = Some(tokio::spawn(async move {
            if let Err(error) = Self::run_socket(url, instruments, &producer).await {
                error!("Websocket feed stopped with error: {error:?}");
                let _ = producer.fail(error);
            }
        }));

        Ok(stream)
    }
}

impl Drop for WebSocketFeed {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
