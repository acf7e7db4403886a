//! Canonical in-memory state for tracks and the trackouts of the current track.
//!
//! State only changes through [`Transition`]s. Each transition is applied as a
//! single synchronous step, so observers never see `loading` and `error` out of
//! step with each other.

use shared::{
    domain::TrackId,
    protocol::{Track, Trackout},
};
use tokio::sync::watch;
use tracing::{debug, trace};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    /// Tracks in server response order.
    pub list: Vec<Track>,
    /// Detail view. A default `Track` (empty id) is the "nothing loaded" placeholder.
    pub current: Track,
    pub error: Option<String>,
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    BeginRequest,
    ListSucceeded(Vec<Track>),
    OneSucceeded(Track),
    TrackCreated,
    TrackUpdated(Track),
    TrackoutsRequested,
    TrackoutsSucceeded {
        track_id: TrackId,
        trackouts: Vec<Trackout>,
    },
    TrackoutsFailed(String),
    TrackoutAdded {
        track_id: TrackId,
        trackout: Trackout,
    },
    DeleteSucceeded(TrackId),
    UploadSucceeded,
    TrackoutWavUpdated,
    ProcessingStarted,
    /// Terminal failure. `Some` records the message in `error`.
    RequestFailed(Option<String>),
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeginRequest => "begin_request",
            Self::ListSucceeded(_) => "list_succeeded",
            Self::OneSucceeded(_) => "one_succeeded",
            Self::TrackCreated => "track_created",
            Self::TrackUpdated(_) => "track_updated",
            Self::TrackoutsRequested => "trackouts_requested",
            Self::TrackoutsSucceeded { .. } => "trackouts_succeeded",
            Self::TrackoutsFailed(_) => "trackouts_failed",
            Self::TrackoutAdded { .. } => "trackout_added",
            Self::DeleteSucceeded(_) => "delete_succeeded",
            Self::UploadSucceeded => "upload_succeeded",
            Self::TrackoutWavUpdated => "trackout_wav_updated",
            Self::ProcessingStarted => "processing_started",
            Self::RequestFailed(_) => "request_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::BeginRequest | Self::TrackoutsRequested)
    }
}

impl StoreState {
    pub fn has_current(&self) -> bool {
        !self.current.is_placeholder()
    }

    pub fn is_current(&self, track_id: &TrackId) -> bool {
        self.has_current() && &self.current.id == track_id
    }

    pub fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::BeginRequest | Transition::TrackoutsRequested => {
                self.loading = true;
            }
            Transition::ListSucceeded(tracks) => {
                self.list = tracks;
                self.succeed();
            }
            Transition::OneSucceeded(track) => {
                self.current = track.normalized();
                self.succeed();
            }
            Transition::TrackCreated | Transition::UploadSucceeded => {
                self.succeed();
            }
            Transition::TrackUpdated(track) => {
                if self.is_current(&track.id) {
                    self.current.name = track.name;
                    self.current.info = track.info;
                }
                self.succeed();
            }
            Transition::TrackoutsSucceeded {
                track_id,
                trackouts,
            } => {
                if self.is_current(&track_id) {
                    self.current.trackouts = trackouts;
                } else {
                    debug!(%track_id, current = %self.current.id, "dropping trackouts for a track that is no longer current");
                }
                self.succeed();
            }
            Transition::TrackoutAdded { track_id, trackout } => {
                if self.is_current(&track_id) {
                    self.current.trackouts.push(trackout);
                } else {
                    debug!(%track_id, current = %self.current.id, "created trackout belongs to a track that is no longer current");
                }
                self.succeed();
            }
            Transition::DeleteSucceeded(track_id) => {
                self.list.retain(|track| track.id != track_id);
                self.succeed();
            }
            Transition::TrackoutWavUpdated | Transition::ProcessingStarted => {
                self.succeed();
            }
            Transition::TrackoutsFailed(message) => {
                self.error = Some(message);
                self.loading = false;
            }
            Transition::RequestFailed(message) => {
                if let Some(message) = message {
                    self.error = Some(message);
                }
                self.loading = false;
            }
        }
    }

    fn succeed(&mut self) {
        self.error = None;
        self.loading = false;
    }
}

/// Owner of one [`StoreState`]. Views subscribe through [`EntityStore::subscribe`].
pub struct EntityStore {
    state: watch::Sender<StoreState>,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self { state }
    }

    pub fn apply(&self, transition: Transition) {
        let name = transition.name();
        let terminal = transition.is_terminal();
        self.state.send_modify(|state| state.apply(transition));
        trace!(transition = name, terminal, "store transition applied");
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn current_track_id(&self) -> Option<TrackId> {
        let state = self.state.borrow();
        state.has_current().then(|| state.current.id.clone())
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
