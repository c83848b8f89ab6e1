//! High-level facade crate for the `boardwatch-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the core and tracker crates
//! - (feature `image`) adapters between `image::RgbImage` and the core image
//!   types, plus a file-backed [`frames::ImageSequenceSource`]
//! - (feature `cli`) the `boardwatch` command-line tool
//!
//! ## Quickstart
//!
//! ```no_run
//! use boardwatch::frames::ImageSequenceSource;
//! use boardwatch::{BoardTrackingSession, Camera, TrackerParams};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let camera = Camera::new(ImageSequenceSource::open(["before.png"])?.cycled());
//! let mut session = BoardTrackingSession::in_dir(".boardwatch", TrackerParams::default());
//! session.new_game(&camera)?;
//!
//! let camera = Camera::new(ImageSequenceSource::open(["after.png"])?.cycled());
//! let outcome = session.complete_turn(&camera)?;
//! println!("{}\n{}", outcome.record.notation, session.board());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `boardwatch::core`: images, homography, quads and color conversion.
//! - `boardwatch::tracker`: the stateful pipeline and [`BoardTrackingSession`].
//! - `boardwatch::frames` (feature `image`): `image` crate interop.

pub use boardwatch_core as core;
pub use boardwatch_tracker as tracker;

pub use boardwatch_core::{init_with_level, Point2, Quad, RgbImage, RgbImageView};
pub use boardwatch_tracker::{
    render_overlay, BoardColorGrid, BoardModel, BoardTrackingSession, Camera, ChangeReport,
    FrameSource, MoveRecord, ResolvedMove, SessionError, SessionPaths, SharedSession, Side,
    Square, TrackerParams, TurnOutcome,
};

#[cfg(feature = "image")]
pub mod frames;

/// Install a `tracing-subscriber` fmt subscriber and route `log` records into it.
///
/// Filtered by `RUST_LOG` (default `info`). Calling it twice is a no-op.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = if json {
        let subscriber = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .flatten_event(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    } else {
        let subscriber = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::Uptime::default())
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    };
    if installed {
        let _ = tracing_log::LogTracer::init();
    }
}
