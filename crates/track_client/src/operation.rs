//! Per-operation contract: how each use case reports failure and which body
//! shape its endpoint answers with.

use crate::{store::Transition, transport::ResponseShape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateTrack,
    ListTracks,
    GetTrackDetails,
    GetTrackouts,
    AddTrackout,
    CreateTrackoutWithoutWav,
    UpdateTrack,
    DeleteTrack,
    UploadTrackoutWav,
    UpdateTrackoutWithWav,
    ProcessTrack,
}

/// Where a failure ends up once the operation settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Written to the store's `error`; the caller gets no error value.
    Record,
    /// Returned to the caller; `error` is left alone.
    Raise,
    RecordAndRaise,
    /// Reported to diagnostics only.
    Swallow,
}

impl FailurePolicy {
    pub fn records(self) -> bool {
        matches!(self, Self::Record | Self::RecordAndRaise)
    }

    pub fn raises(self) -> bool {
        matches!(self, Self::Raise | Self::RecordAndRaise)
    }
}

impl Operation {
    pub const ALL: [Operation; 11] = [
        Operation::CreateTrack,
        Operation::ListTracks,
        Operation::GetTrackDetails,
        Operation::GetTrackouts,
        Operation::AddTrackout,
        Operation::CreateTrackoutWithoutWav,
        Operation::UpdateTrack,
        Operation::DeleteTrack,
        Operation::UploadTrackoutWav,
        Operation::UpdateTrackoutWithWav,
        Operation::ProcessTrack,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CreateTrack => "create_track",
            Self::ListTracks => "list_tracks",
            Self::GetTrackDetails => "get_track_details",
            Self::GetTrackouts => "get_trackouts",
            Self::AddTrackout => "add_trackout",
            Self::CreateTrackoutWithoutWav => "create_trackout_without_wav",
            Self::UpdateTrack => "update_track",
            Self::DeleteTrack => "delete_track",
            Self::UploadTrackoutWav => "upload_trackout_wav",
            Self::UpdateTrackoutWithWav => "update_trackout_with_wav",
            Self::ProcessTrack => "process_track",
        }
    }

    pub fn failure_policy(self) -> FailurePolicy {
        match self {
            Self::CreateTrack | Self::UpdateTrack | Self::DeleteTrack | Self::ProcessTrack => {
                FailurePolicy::Record
            }
            Self::ListTracks | Self::GetTrackDetails | Self::GetTrackouts => {
                FailurePolicy::RecordAndRaise
            }
            Self::AddTrackout | Self::CreateTrackoutWithoutWav | Self::UploadTrackoutWav => {
                FailurePolicy::Raise
            }
            Self::UpdateTrackoutWithWav => FailurePolicy::Swallow,
        }
    }

    pub fn response_shape(self) -> ResponseShape {
        match self {
            Self::CreateTrack | Self::ListTracks | Self::GetTrackDetails | Self::GetTrackouts => {
                ResponseShape::Enveloped
            }
            // Both share `POST /trackouts`, whose reply may or may not be wrapped.
            Self::AddTrackout | Self::CreateTrackoutWithoutWav => ResponseShape::Either,
            Self::UpdateTrack
            | Self::DeleteTrack
            | Self::UploadTrackoutWav
            | Self::UpdateTrackoutWithWav
            | Self::ProcessTrack => ResponseShape::Raw,
        }
    }

    pub fn begin_transition(self) -> Transition {
        match self {
            Self::GetTrackouts => Transition::TrackoutsRequested,
            _ => Transition::BeginRequest,
        }
    }

    pub fn failure_transition(self, message: String) -> Transition {
        let policy = self.failure_policy();
        match self {
            Self::GetTrackouts => Transition::TrackoutsFailed(message),
            _ if policy.records() => Transition::RequestFailed(Some(message)),
            _ => Transition::RequestFailed(None),
        }
    }
}
