use crate::config::DeviceConfig;
use crate::error::{Result, WeheadError};
use crate::frame;
use crate::protocol::{self, Envelope, MoveCommand, SttPayload, TtsCommand, VideoPayload, Voice};
use futures_util::{SinkExt, StreamExt};
use image::RgbImage;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

const RETRY_DELAY: Duration = Duration::from_millis(500);

type VideoCallback = Box<dyn Fn(RgbImage) + Send + 'static>;
type PhraseCallback = Box<dyn Fn(String) + Send + 'static>;

/// One optional slot per inbound event type. Registration is
/// last-writer-wins; there is deliberately no fan-out.
#[derive(Default)]
struct CallbackSlots {
    video: Option<VideoCallback>,
    phrase: Option<PhraseCallback>,
}

/// Handle to one Wehead, owning one WebSocket session.
///
/// Commands (`pose`, `say`) may be sent from any task or thread; inbound
/// callbacks run serialized on the session's reader task. Multiple handles to
/// different devices can coexist in one process — nothing here is global.
pub struct Device {
    outbound: mpsc::UnboundedSender<Message>,
    slots: Arc<Mutex<CallbackSlots>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device").finish_non_exhaustive()
    }
}

impl Device {
    /// Connect to the Wehead with default settings.
    ///
    /// Resolves once the WebSocket handshake completed and the auth payload
    /// `{token, role: "user"}` has been delivered. Dial failures are retried
    /// with a short backoff until the connect budget (100 s by default) runs
    /// out.
    pub async fn connect(token: &str) -> Result<Self> {
        Self::connect_with_config(DeviceConfig::default(), token).await
    }

    pub async fn connect_with_config(config: DeviceConfig, token: &str) -> Result<Self> {
        let url = socket_url(&config)?;
        let deadline = Instant::now() + config.connect_timeout;

        let ws_stream = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(WeheadError::ConnectTimeout);
            }
            match tokio::time::timeout(remaining, connect_async(url.as_str())).await {
                Ok(Ok((ws_stream, response))) => {
                    log::info!("Connected to {} (status {})", url, response.status());
                    break ws_stream;
                }
                Ok(Err(e)) if config.retry => {
                    log::warn!("Connection attempt failed, retrying: {}", e);
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Err(WeheadError::ConnectTimeout),
            }
        };

        let (mut write, mut read) = ws_stream.split();

        // Auth is the first frame the server sees on this session.
        let auth = json!({ "token": token, "role": "user" }).to_string();
        write.send(Message::Text(auth.into())).await?;

        // Dedicated writer task: commands are queued from any caller thread
        // and serialized onto the sink here. A forwarded Close frame ends it.
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = write.send(message).await {
                    log::warn!("Outbound send failed: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = write.close().await;
            log::debug!("Writer task finished");
        });

        let slots = Arc::new(Mutex::new(CallbackSlots::default()));
        let dispatch_slots = Arc::clone(&slots);
        let reader = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => dispatch(&dispatch_slots, text.as_str()),
                    Ok(Message::Close(close_frame)) => {
                        log::info!("Server closed connection: {:?}", close_frame);
                        break;
                    }
                    Ok(_) => log::debug!("Ignoring non-text frame"),
                    Err(e) => {
                        log::error!("WebSocket read error: {}", e);
                        break;
                    }
                }
            }
            log::debug!("Reader task finished");
        });

        Ok(Self {
            outbound,
            slots,
            writer: Mutex::new(Some(writer)),
            reader: Mutex::new(Some(reader)),
        })
    }

    /// Move the head to an absolute pitch/yaw pose.
    ///
    /// Angles are forwarded as-is; no range validation happens on this side.
    pub fn pose(&self, pitch: f64, yaw: f64) -> Result<()> {
        self.send_command(
            protocol::EVENT_MOVE,
            serde_json::to_value(MoveCommand::new(pitch, yaw))?,
        )
    }

    /// Speak `text` with the default voice ([`Voice::Shimmer`]).
    pub fn say(&self, text: &str) -> Result<()> {
        self.say_with_voice(text, &Voice::default().to_string())
    }

    /// Speak `text` with a named voice.
    ///
    /// The name is forwarded unchecked — an unknown voice is the device's
    /// problem, not ours. [`Voice`] lists the names the device understands.
    pub fn say_with_voice(&self, text: &str, voice: &str) -> Result<()> {
        self.send_command(
            protocol::EVENT_TTS,
            serde_json::to_value(TtsCommand::with_voice(text, voice))?,
        )
    }

    /// Register the callback for inbound video frames.
    ///
    /// Frames arrive decoded as 8-bit RGB. Replaces any previously registered
    /// video callback; only the most recent one receives frames. Frames that
    /// fail to decode are logged and dropped without reaching the callback.
    pub fn on_video<F>(&self, callback: F)
    where
        F: Fn(RgbImage) + Send + 'static,
    {
        self.slots.lock().unwrap().video = Some(Box::new(callback));
    }

    /// Register the callback for recognized phrases.
    ///
    /// The text is handed over verbatim. Replaces any previously registered
    /// phrase callback.
    pub fn on_phrase<F>(&self, callback: F)
    where
        F: Fn(String) + Send + 'static,
    {
        self.slots.lock().unwrap().phrase = Some(Box::new(callback));
    }

    /// Close the session: send a close frame, flush the writer, stop the
    /// reader. Commands sent after this return [`WeheadError::ConnectionClosed`].
    pub async fn close(&self) {
        if self.outbound.send(Message::Close(None)).is_err() {
            log::debug!("Close requested but connection already gone");
        }
        let writer = self.writer.lock().unwrap().take();
        if let Some(handle) = writer {
            let _ = handle.await;
        }
        let reader = self.reader.lock().unwrap().take();
        if let Some(handle) = reader {
            handle.abort();
        }
        log::info!("Connection closed");
    }

    /// Queue one named event for the writer task.
    ///
    /// A failed send is logged *and* surfaced as an error value — callers can
    /// ignore it for fire-and-forget control, but nothing panics and nothing
    /// is silently swallowed.
    fn send_command(&self, event: &str, data: Value) -> Result<()> {
        let raw = serde_json::to_string(&Envelope::new(event, data))?;
        if self.outbound.send(Message::Text(raw.into())).is_err() {
            log::warn!("Dropping '{}' command: connection closed", event);
            return Err(WeheadError::ConnectionClosed);
        }
        Ok(())
    }
}

/// Rewrite the configured base URL for the socket dial: https/wss become wss,
/// everything else plain ws, with the handshake sub-path appended.
fn socket_url(config: &DeviceConfig) -> Result<Url> {
    let mut url = Url::parse(&config.base_url)?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|_| WeheadError::Config(format!("cannot dial {}", config.base_url)))?;
    url.set_path(&config.socket_path);
    Ok(url)
}

fn dispatch(slots: &Mutex<CallbackSlots>, raw: &str) {
    let envelope: Envelope = match serde_json::from_str(raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            log::warn!("Unparseable inbound frame: {}", e);
            return;
        }
    };

    match envelope.event.as_str() {
        protocol::EVENT_VIDEO => {
            let payload: VideoPayload = match serde_json::from_value(envelope.data) {
                Ok(payload) => payload,
                Err(e) => {
                    log::warn!("Malformed video payload: {}", e);
                    return;
                }
            };
            // Drop-and-log: one bad frame must not kill the dispatch loop.
            let image = match frame::decode_frame(&payload.img) {
                Ok(image) => image,
                Err(e) => {
                    log::warn!("Dropping undecodable video frame: {}", e);
                    return;
                }
            };
            if let Some(callback) = slots.lock().unwrap().video.as_ref() {
                callback(image);
            }
        }
        protocol::EVENT_STT => {
            let payload: SttPayload = match serde_json::from_value(envelope.data) {
                Ok(payload) => payload,
                Err(e) => {
                    log::warn!("Malformed stt payload: {}", e);
                    return;
                }
            };
            if let Some(callback) = slots.lock().unwrap().phrase.as_ref() {
                callback(payload.text);
            }
        }
        other => log::debug!("Ignoring unknown event '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(base_url: &str) -> DeviceConfig {
        DeviceConfig {
            base_url: base_url.to_string(),
            ..DeviceConfig::default()
        }
    }

    #[test]
    fn socket_url_rewrites_https_to_wss() {
        let url = socket_url(&config_for("https://device.example.com")).unwrap();
        assert_eq!(url.as_str(), "wss://device.example.com/msg");
    }

    #[test]
    fn socket_url_rewrites_http_to_ws() {
        let url = socket_url(&config_for("http://127.0.0.1:9000")).unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:9000/msg");
    }

    #[test]
    fn socket_url_respects_custom_path() {
        let mut config = config_for("https://device.example.com");
        config.socket_path = "socket".to_string();
        let url = socket_url(&config).unwrap();
        assert_eq!(url.path(), "/socket");
    }

    #[test]
    fn socket_url_rejects_garbage() {
        assert!(socket_url(&config_for("not a url")).is_err());
    }

    #[test]
    fn dispatch_ignores_unknown_events_and_garbage() {
        let slots = Mutex::new(CallbackSlots::default());
        // Neither of these may panic or poison the slots.
        dispatch(&slots, "{\"event\": \"heartbeat\", \"data\": {}}");
        dispatch(&slots, "not json at all");
        dispatch(&slots, "{\"event\": \"video\", \"data\": {\"wrong\": 1}}");
        assert!(slots.lock().unwrap().video.is_none());
    }

    #[test]
    fn phrase_slot_is_last_writer_wins() {
        let slots = Mutex::new(CallbackSlots::default());
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&first);
        slots.lock().unwrap().phrase = Some(Box::new(move |text| sink.lock().unwrap().push(text)));
        let sink = Arc::clone(&second);
        slots.lock().unwrap().phrase = Some(Box::new(move |text| sink.lock().unwrap().push(text)));

        dispatch(&slots, "{\"event\": \"stt\", \"data\": {\"text\": \"hello\"}}");

        assert!(first.lock().unwrap().is_empty());
        assert_eq!(second.lock().unwrap().as_slice(), ["hello".to_string()]);
    }
}
