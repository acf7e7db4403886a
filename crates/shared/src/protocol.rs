use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::{TrackId, TrackoutId, UserId};

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A user's audio project as served by `/tracks`.
///
/// `trackouts` is never part of the track endpoints' responses; it is filled
/// locally from `/trackouts?track_id=..`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub info: String,
    #[serde(
        rename = "user_id",
        alias = "owner_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub owner_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverb: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deess: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trackouts: Vec<Trackout>,
}

impl Track {
    /// Projection used for the detail view: identity, name, info and owner only,
    /// with an empty trackout collection.
    pub fn normalized(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            info: self.info.clone(),
            owner_id: self.owner_id.clone(),
            ..Self::default()
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.is_empty()
    }
}

/// Per-stem processing parameters. `eq` and `compression` are always present on
/// the wire; anything else the server stores is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackoutSettings {
    #[serde(default)]
    pub eq: Map<String, Value>,
    #[serde(default)]
    pub compression: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Key under [`TrackoutSettings::extra`] holding settings the client could not parse.
pub const UNPARSED_SETTINGS_KEY: &str = "raw";

// Stored server-side as a text column, so it may arrive as JSON text or null.
// One malformed row must not fail a whole trackout listing.
fn settings_from_any<'de, D>(deserializer: D) -> Result<TrackoutSettings, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Null => return Ok(TrackoutSettings::default()),
        Value::String(raw) if raw.trim().is_empty() => return Ok(TrackoutSettings::default()),
        Value::String(raw) => serde_json::from_str(raw),
        other => serde_json::from_value(other.clone()),
    };
    Ok(parsed.unwrap_or_else(|_| {
        let mut settings = TrackoutSettings::default();
        settings.extra.insert(UNPARSED_SETTINGS_KEY.to_string(), value);
        settings
    }))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trackout {
    pub id: TrackoutId,
    pub track_id: TrackId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "settings_from_any")]
    pub settings: TrackoutSettings,
    #[serde(
        rename = "wavefile",
        alias = "path",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub wave_file_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTrackRequest {
    pub name: String,
    pub user_id: UserId,
    pub artist: String,
    pub info: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTrackRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    pub info: String,
}

impl From<&Track> for UpdateTrackRequest {
    fn from(track: &Track) -> Self {
        Self {
            name: track.name.clone(),
            artist: track.artist.clone(),
            info: track.info.clone(),
        }
    }
}

/// Body for `POST /trackouts`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTrackout {
    pub track_id: TrackId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub settings: TrackoutSettings,
    #[serde(rename = "wavefile", default, skip_serializing_if = "Option::is_none")]
    pub wave_file_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// Body for `PUT /trackouts/{id}` after a wav has been attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackoutWavUpdate {
    #[serde(skip)]
    pub trackout_id: TrackoutId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<TrackoutSettings>,
    #[serde(rename = "wavefile", default, skip_serializing_if = "Option::is_none")]
    pub wave_file_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub payload: T,
}

/// Acknowledgement returned by delete/update/upload endpoints. Every field is
/// optional because the endpoints disagree on what they echo back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationAck {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl MutationAck {
    /// Reads whatever the endpoint returned; bodies that are not objects
    /// (empty, `null`, plain text) yield an empty ack.
    pub fn from_value_lossy(value: &Value) -> Self {
        let body = value.get("payload").unwrap_or(value);
        serde_json::from_value(body.clone()).unwrap_or_default()
    }
}
