use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound event names understood by the Wehead.
pub const EVENT_MOVE: &str = "move";
pub const EVENT_TTS: &str = "tts";

/// Inbound event names the Wehead emits.
pub const EVENT_VIDEO: &str = "video";
pub const EVENT_STT: &str = "stt";

/// Motion mode where pitch/yaw are absolute target angles, not deltas.
pub const MODE_POSE_ABSOLUTE: &str = "pose_absolute";

/// Wire frame: one JSON text message per event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    pub data: Value,
}

impl Envelope {
    pub fn new(event: &str, data: Value) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }
}

/// Payload of the outbound `move` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveCommand {
    pub mode: String,
    pub pitch: f64,
    pub yaw: f64,
}

impl MoveCommand {
    /// Absolute pose target. Angles are forwarded as-is; range checks are the
    /// device's responsibility.
    pub fn new(pitch: f64, yaw: f64) -> Self {
        Self {
            mode: MODE_POSE_ABSOLUTE.to_string(),
            pitch,
            yaw,
        }
    }
}

/// Payload of the outbound `tts` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsCommand {
    pub text: String,
    pub voice: String,
}

impl TtsCommand {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_voice(text, Voice::default().to_string())
    }

    /// `voice` is forwarded unchecked; an unknown name is rejected by the
    /// device, not here. See [`Voice`] for the names the device knows.
    pub fn with_voice(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
        }
    }
}

/// Payload of the inbound `video` event: one base64-encoded still frame.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoPayload {
    pub img: String,
}

/// Payload of the inbound `stt` event: one recognized phrase.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SttPayload {
    pub text: String,
}

/// Voices the Wehead can speak with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Voice {
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    #[default]
    Shimmer,
}
