//! Action orchestrator: one async method per track/trackout use case.
//!
//! Every method runs the same protocol against the [`EntityStore`]: a begin
//! transition, local validation, the transport call, then exactly one terminal
//! transition. What the caller sees on failure is decided by the operation's
//! [`FailurePolicy`](crate::operation::FailurePolicy), which is why the return
//! types differ between methods.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    domain::{TrackId, TrackoutId},
    protocol::{
        CreateTrackRequest, MutationAck, NewTrackout, Track, Trackout, TrackoutSettings,
        TrackoutWavUpdate, UpdateTrackRequest,
    },
};
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

use crate::{
    diagnostics::{Diagnostics, TracingDiagnostics},
    error::TrackError,
    identity::IdentityStore,
    operation::Operation,
    store::{EntityStore, StoreState, Transition},
    transport::{ApiRequest, Transport},
};

const TRACKS_PATH: &str = "/tracks";
const TRACKOUTS_PATH: &str = "/trackouts";
const DEFAULT_WAV_CONTENT_TYPE: &str = "audio/wav";

/// Input for [`TrackActions::create_trackout_without_wav`]. Settings and
/// ownership are filled in by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackoutDraft {
    pub track_id: TrackId,
    pub name: String,
    pub kind: String,
    pub wave_file_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WavUpload {
    pub trackout_id: TrackoutId,
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

pub struct TrackActions {
    transport: Arc<dyn Transport>,
    identity: Arc<dyn IdentityStore>,
    diagnostics: Arc<dyn Diagnostics>,
    store: EntityStore,
}

fn operation_span(op: Operation) -> Span {
    info_span!(
        "track_operation",
        op = op.name(),
        correlation_id = %Uuid::new_v4()
    )
}

fn require_text(field: &str, value: &str) -> Result<(), TrackError> {
    if value.trim().is_empty() {
        return Err(TrackError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

impl TrackActions {
    pub fn new(transport: Arc<dyn Transport>, identity: Arc<dyn IdentityStore>) -> Self {
        Self::with_dependencies(
            transport,
            identity,
            Arc::new(TracingDiagnostics),
            EntityStore::new(),
        )
    }

    pub fn with_dependencies(
        transport: Arc<dyn Transport>,
        identity: Arc<dyn IdentityStore>,
        diagnostics: Arc<dyn Diagnostics>,
        store: EntityStore,
    ) -> Self {
        Self {
            transport,
            identity,
            diagnostics,
            store,
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn state(&self) -> StoreState {
        self.store.snapshot()
    }

    async fn call<T: DeserializeOwned>(
        &self,
        op: Operation,
        request: ApiRequest,
    ) -> Result<T, TrackError> {
        let body = self.transport.send(request).await?;
        Ok(op.response_shape().decode(body)?.into_inner())
    }

    fn settle<T>(
        &self,
        op: Operation,
        outcome: Result<T, TrackError>,
        success: impl FnOnce(&T) -> Transition,
    ) -> Result<T, TrackError> {
        match outcome {
            Ok(value) => {
                self.store.apply(success(&value));
                self.diagnostics.operation_succeeded(op);
                Ok(value)
            }
            Err(err) => {
                self.store.apply(op.failure_transition(err.message()));
                self.diagnostics
                    .operation_failed(op, &err, op.failure_policy());
                Err(err)
            }
        }
    }

    fn require_current(&self, track_id: &TrackId) -> Result<(), TrackError> {
        match self.store.current_track_id() {
            None => Err(TrackError::State("no track is loaded".into())),
            Some(current) if &current != track_id => Err(TrackError::State(format!(
                "track {track_id} is not the loaded track (current is {current})"
            ))),
            Some(_) => Ok(()),
        }
    }

    /// Creates a track. Failures are only recorded in the store; `None` means
    /// the caller should look at `error`.
    pub async fn create_track(&self, input: CreateTrackRequest) -> Option<Track> {
        let op = Operation::CreateTrack;
        async move {
            self.store.apply(op.begin_transition());
            let outcome: Result<Track, TrackError> = async {
                require_text("track name", &input.name)?;
                require_text("user id", input.user_id.as_str())?;
                self.call(op, ApiRequest::post_json(TRACKS_PATH, &input)?)
                    .await
            }
            .await;
            self.settle(op, outcome, |_| Transition::TrackCreated).ok()
        }
        .instrument(operation_span(op))
        .await
    }

    pub async fn list_tracks(&self) -> Result<Vec<Track>, TrackError> {
        let op = Operation::ListTracks;
        async move {
            self.store.apply(op.begin_transition());
            let outcome = self.call(op, ApiRequest::get(TRACKS_PATH)).await;
            self.settle(op, outcome, |tracks: &Vec<Track>| {
                Transition::ListSucceeded(tracks.clone())
            })
        }
        .instrument(operation_span(op))
        .await
    }

    /// Loads one track into `current`. The detail endpoint carries no
    /// trackouts, so the result always has an empty trackout list.
    pub async fn get_track_details(&self, track_id: &TrackId) -> Result<Track, TrackError> {
        let op = Operation::GetTrackDetails;
        async move {
            self.store.apply(op.begin_transition());
            let outcome: Result<Track, TrackError> = async {
                require_text("track id", track_id.as_str())?;
                self.call(op, ApiRequest::get(format!("{TRACKS_PATH}/{track_id}")))
                    .await
            }
            .await;
            let outcome = outcome.map(|track| track.normalized());
            self.settle(op, outcome, |track| Transition::OneSucceeded(track.clone()))
        }
        .instrument(operation_span(op))
        .await
    }

    pub async fn get_trackouts(&self, track_id: &TrackId) -> Result<Vec<Trackout>, TrackError> {
        let op = Operation::GetTrackouts;
        async move {
            self.store.apply(op.begin_transition());
            let outcome: Result<Vec<Trackout>, TrackError> = async {
                require_text("track id", track_id.as_str())?;
                let request =
                    ApiRequest::get(TRACKOUTS_PATH).with_query("track_id", track_id.as_str());
                self.call(op, request).await
            }
            .await;
            self.settle(op, outcome, |trackouts| Transition::TrackoutsSucceeded {
                track_id: track_id.clone(),
                trackouts: trackouts.clone(),
            })
        }
        .instrument(operation_span(op))
        .await
    }

    /// Creates a trackout for the loaded track and appends it to
    /// `current.trackouts`. Every failure is returned to the caller.
    pub async fn add_trackout(&self, trackout: NewTrackout) -> Result<Trackout, TrackError> {
        let op = Operation::AddTrackout;
        async move {
            self.store.apply(op.begin_transition());
            let outcome: Result<Trackout, TrackError> = async {
                self.require_current(&trackout.track_id)?;
                require_text("trackout name", &trackout.name)?;
                self.call(op, ApiRequest::post_json(TRACKOUTS_PATH, &trackout)?)
                    .await
            }
            .await;
            self.settle(op, outcome, |created| Transition::TrackoutAdded {
                track_id: trackout.track_id.clone(),
                trackout: created.clone(),
            })
        }
        .instrument(operation_span(op))
        .await
    }

    pub async fn create_trackout_without_wav(
        &self,
        draft: TrackoutDraft,
    ) -> Result<Trackout, TrackError> {
        let op = Operation::CreateTrackoutWithoutWav;
        async move {
            self.store.apply(op.begin_transition());
            let outcome: Result<Trackout, TrackError> = async {
                self.require_current(&draft.track_id)?;
                require_text("trackout name", &draft.name)?;
                let user_id = self.identity.current_user_id().ok_or_else(|| {
                    TrackError::Validation("no signed-in user to own the trackout".into())
                })?;
                let body = NewTrackout {
                    track_id: draft.track_id.clone(),
                    name: draft.name.clone(),
                    kind: draft.kind.clone(),
                    settings: TrackoutSettings::default(),
                    wave_file_ref: draft.wave_file_ref.clone(),
                    owner_id: Some(user_id.clone()),
                    user_id: Some(user_id),
                };
                self.call(op, ApiRequest::post_json(TRACKOUTS_PATH, &body)?)
                    .await
            }
            .await;
            self.settle(op, outcome, |created| Transition::TrackoutAdded {
                track_id: draft.track_id.clone(),
                trackout: created.clone(),
            })
        }
        .instrument(operation_span(op))
        .await
    }

    /// Sends the track's editable fields with `PUT /tracks/{id}`. Failures are
    /// recorded in the store only.
    pub async fn update_track(&self, track: &Track) {
        let op = Operation::UpdateTrack;
        async move {
            self.store.apply(op.begin_transition());
            let outcome: Result<Value, TrackError> = async {
                require_text("track id", track.id.as_str())?;
                require_text("track name", &track.name)?;
                let body = UpdateTrackRequest::from(track);
                self.call(
                    op,
                    ApiRequest::put_json(format!("{TRACKS_PATH}/{}", track.id), &body)?,
                )
                .await
            }
            .await;
            let _ = self.settle(op, outcome, |_| Transition::TrackUpdated(track.clone()));
        }
        .instrument(operation_span(op))
        .await
    }

    pub async fn delete_track(&self, track: &Track) {
        let op = Operation::DeleteTrack;
        async move {
            self.store.apply(op.begin_transition());
            let outcome: Result<Value, TrackError> = async {
                require_text("track id", track.id.as_str())?;
                self.call(op, ApiRequest::delete(format!("{TRACKS_PATH}/{}", track.id)))
                    .await
            }
            .await;
            let _ = self.settle(op, outcome, |_| {
                Transition::DeleteSucceeded(track.id.clone())
            });
        }
        .instrument(operation_span(op))
        .await
    }

    pub async fn upload_trackout_wav(&self, upload: WavUpload) -> Result<MutationAck, TrackError> {
        let op = Operation::UploadTrackoutWav;
        async move {
            self.store.apply(op.begin_transition());
            let outcome: Result<MutationAck, TrackError> = async move {
                require_text("trackout id", upload.trackout_id.as_str())?;
                if upload.bytes.is_empty() {
                    return Err(TrackError::Validation("wav upload is empty".into()));
                }
                let content_type = upload
                    .content_type
                    .unwrap_or_else(|| DEFAULT_WAV_CONTENT_TYPE.to_string());
                let mut request = ApiRequest::post_bytes(
                    format!("{TRACKOUTS_PATH}/wav/{}", upload.trackout_id),
                    upload.bytes,
                    content_type,
                );
                if let Some(filename) = upload.filename {
                    request = request.with_query("filename", filename);
                }
                let body: Value = self.call(op, request).await?;
                Ok(MutationAck::from_value_lossy(&body))
            }
            .await;
            self.settle(op, outcome, |_| Transition::UploadSucceeded)
        }
        .instrument(operation_span(op))
        .await
    }

    /// Asks the server to start processing the track's trackouts. Failures are
    /// recorded in the store only; `None` means the caller should look at `error`.
    pub async fn process_track(&self, track_id: &TrackId) -> Option<MutationAck> {
        let op = Operation::ProcessTrack;
        async move {
            self.store.apply(op.begin_transition());
            let outcome: Result<MutationAck, TrackError> = async {
                require_text("track id", track_id.as_str())?;
                let request =
                    ApiRequest::put_empty(format!("{TRACKS_PATH}/process/{track_id}"));
                let body: Value = self.call(op, request).await?;
                Ok(MutationAck::from_value_lossy(&body))
            }
            .await;
            self.settle(op, outcome, |_| Transition::ProcessingStarted).ok()
        }
        .instrument(operation_span(op))
        .await
    }

    /// Best effort: failures are reported to diagnostics and otherwise dropped.
    pub async fn update_trackout_with_wav(&self, update: TrackoutWavUpdate) {
        let op = Operation::UpdateTrackoutWithWav;
        async move {
            self.store.apply(op.begin_transition());
            let outcome: Result<Value, TrackError> = async {
                require_text("trackout id", update.trackout_id.as_str())?;
                self.call(
                    op,
                    ApiRequest::put_json(
                        format!("{TRACKOUTS_PATH}/{}", update.trackout_id),
                        &update,
                    )?,
                )
                .await
            }
            .await;
            let _ = self.settle(op, outcome, |_| Transition::TrackoutWavUpdated);
        }
        .instrument(operation_span(op))
        .await
    }
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
