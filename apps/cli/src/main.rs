use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use shared::{
    domain::{TrackId, TrackoutId, UserId},
    protocol::{CreateTrackRequest, TrackoutWavUpdate},
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use track_client::{
    load_settings, prepare_server_url, HttpTransport, SessionIdentity, TrackActions,
    TrackoutDraft, WavUpload,
};

#[derive(Parser, Debug)]
#[command(name = "ravel", about = "Manage tracks and trackouts on a Ravel server")]
struct Cli {
    /// Overrides `server_url` from client.toml and the environment.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
    /// User that owns created tracks and trackouts.
    #[arg(long)]
    user: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List,
    Show {
        id: String,
    },
    Trackouts {
        track_id: String,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        artist: String,
        #[arg(long, default_value = "")]
        info: String,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        info: Option<String>,
    },
    Delete {
        id: String,
    },
    /// Queue the track's trackouts for server-side processing.
    Process {
        id: String,
    },
    AddTrackout {
        track_id: String,
        #[arg(long)]
        name: String,
        #[arg(long = "type", default_value = "audio")]
        kind: String,
    },
    Upload {
        trackout_id: String,
        file: PathBuf,
        /// Stored as the trackout's wavefile reference once the upload succeeds.
        #[arg(long)]
        link: Option<String>,
    },
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// Record-only operations report failures through the store.
fn recorded_error(actions: &TrackActions) -> Result<()> {
    match actions.state().error {
        Some(message) => bail!(message),
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(url) = cli.server_url {
        settings.server_url = url;
    }
    if let Some(token) = cli.token {
        settings.auth_token = Some(token);
    }
    if let Some(user) = cli.user {
        settings.user_id = Some(user);
    }
    settings.server_url = prepare_server_url(&settings.server_url)?;
    info!(server_url = %settings.server_url, "using tracks api");

    let identity = Arc::new(SessionIdentity::default());
    if let Some(user) = &settings.user_id {
        identity.sign_in(user.as_str());
    }
    let transport = HttpTransport::from_settings(&settings)?;
    let actions = TrackActions::new(Arc::new(transport), identity);

    match cli.command {
        Command::List => {
            let tracks = actions.list_tracks().await?;
            print_json(&tracks)?;
        }
        Command::Show { id } => {
            let track = actions.get_track_details(&TrackId::new(id)).await?;
            print_json(&track)?;
        }
        Command::Trackouts { track_id } => {
            let trackouts = actions.get_trackouts(&TrackId::new(track_id)).await?;
            print_json(&trackouts)?;
        }
        Command::Create { name, artist, info } => {
            let user_id = settings
                .user_id
                .clone()
                .context("creating a track needs --user or RAVEL_USER_ID")?;
            let created = actions
                .create_track(CreateTrackRequest {
                    name,
                    user_id: UserId::new(user_id),
                    artist,
                    info,
                })
                .await;
            recorded_error(&actions)?;
            print_json(&created)?;
        }
        Command::Update { id, name, info } => {
            let mut track = actions.get_track_details(&TrackId::new(id)).await?;
            if let Some(name) = name {
                track.name = name;
            }
            if let Some(info) = info {
                track.info = info;
            }
            actions.update_track(&track).await;
            recorded_error(&actions)?;
            print_json(&actions.state().current)?;
        }
        Command::Delete { id } => {
            let track = actions.get_track_details(&TrackId::new(id)).await?;
            actions.delete_track(&track).await;
            recorded_error(&actions)?;
            println!("deleted track {}", track.id);
        }
        Command::Process { id } => {
            let ack = actions.process_track(&TrackId::new(id)).await;
            recorded_error(&actions)?;
            print_json(&ack)?;
        }
        Command::AddTrackout {
            track_id,
            name,
            kind,
        } => {
            let track_id = TrackId::new(track_id);
            actions.get_track_details(&track_id).await?;
            let trackout = actions
                .create_trackout_without_wav(TrackoutDraft {
                    track_id,
                    name,
                    kind,
                    wave_file_ref: None,
                })
                .await?;
            print_json(&trackout)?;
        }
        Command::Upload {
            trackout_id,
            file,
            link,
        } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let trackout_id = TrackoutId::new(trackout_id);
            let ack = actions
                .upload_trackout_wav(WavUpload {
                    trackout_id: trackout_id.clone(),
                    filename: file
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned()),
                    bytes,
                    content_type: None,
                })
                .await?;
            print_json(&ack)?;
            if let Some(wave_file_ref) = link {
                actions
                    .update_trackout_with_wav(TrackoutWavUpdate {
                        trackout_id,
                        wave_file_ref: Some(wave_file_ref),
                        ..TrackoutWavUpdate::default()
                    })
                    .await;
            }
        }
    }

    Ok(())
}
