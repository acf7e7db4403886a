//! Client-side data access for tracks and their trackouts.
//!
//! [`TrackActions`] drives the tracks API through a [`Transport`] and keeps an
//! [`EntityStore`] in step with every request it issues.

pub mod actions;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod identity;
pub mod operation;
pub mod store;
pub mod transport;

pub use actions::{TrackActions, TrackoutDraft, WavUpload};
pub use config::{load_settings, prepare_server_url, ClientSettings};
pub use diagnostics::{Diagnostics, TracingDiagnostics};
pub use error::TrackError;
pub use identity::{IdentityStore, SessionIdentity, StaticIdentity};
pub use operation::{FailurePolicy, Operation};
pub use store::{EntityStore, StoreState, Transition};
pub use transport::{ApiRequest, Body, HttpTransport, Method, RequestBody, ResponseShape, Transport};
