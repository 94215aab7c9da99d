//! `fit-match` correlates an action-camera MP4 clip with the Garmin FIT log
//! file recorded during the same session, then extracts the telemetry slice
//! covering the clip's recorded interval.
//!
//! The shared token is a 95-byte session uuid the camera writes both into the
//! clip's `moov -> udta -> uuid` box and into the FIT file's `camera_event`
//! messages. Matching is pure equality on that token.
//!
//! ## Quick start
//! - [`find_fit_for_video`] answers "which FIT file belongs to this clip?".
//! - [`extract_session`] returns the clip's telemetry as a forward-filled
//!   table trimmed to the `[video_start, video_end)` window.
//!
//! Lower layers are exposed for callers that already hold decoded data:
//! [`mp4::find_session_uuid`] for the box walk, [`fit::classify`] for record
//! classification, and [`extract::session_window`] for boundary selection.

pub mod error;

pub mod extract;
pub mod fit;
pub mod matcher;
pub mod mp4;
pub mod table;

pub use extract::{extract_session, find_fit_for_video, video_session_uuid};
pub use fit::{CameraEvent, CameraEventKind, DecodedLog, TelemetryRecord};
pub use matcher::{MatchedLog, find_matching_fit};
pub use table::TelemetryTable;

pub use error::Error;
