use std::fs::File;
use std::path::Path;

use tracing::warn;

use crate::Error;
use crate::fit::{CameraEvent, CameraEventKind, TelemetryRecord};
use crate::matcher::{MatchedLog, find_matching_fit};
use crate::mp4::{SESSION_UUID_PATH, find_session_uuid};
use crate::table::TelemetryTable;

/// Read the session uuid embedded in a video's metadata tree, if any.
pub fn video_session_uuid(video: &Path) -> Result<Option<String>, Error> {
    let mut file = File::open(video)?;
    find_session_uuid(&mut file, &SESSION_UUID_PATH)
}

/// Locate the FIT file recorded alongside `video`.
///
/// `Ok(None)` means the directory holds usable FIT files but none carries the
/// video's session uuid; a video without a uuid is a caller error.
pub fn find_fit_for_video(video: &Path, fit_dir: &Path) -> Result<Option<MatchedLog>, Error> {
    let session_id = video_session_uuid(video)?.ok_or_else(|| Error::NoSessionId {
        video: video.to_path_buf(),
    })?;
    find_matching_fit(fit_dir, &session_id)
}

/// Extract the telemetry slice covering the video's recorded interval.
///
/// Pipeline: uuid from the video, matching FIT file from `fit_dir`, session
/// window from the start/end camera events, then the telemetry table is
/// forward-filled and trimmed to `[start, end)`.
pub fn extract_session(video: &Path, fit_dir: &Path) -> Result<TelemetryTable, Error> {
    let session_id = video_session_uuid(video)?.ok_or_else(|| Error::NoSessionId {
        video: video.to_path_buf(),
    })?;

    let matched =
        find_matching_fit(fit_dir, &session_id)?.ok_or_else(|| Error::NoMatchingFit {
            session_id: session_id.clone(),
            dir: fit_dir.to_path_buf(),
        })?;

    let (start, end) = session_window(&matched.log.events, &session_id)?;
    Ok(build_table(matched.log.telemetry, start, end))
}

/// Derive the `[start, end)` window from the camera events tagged with
/// `session_id`.
pub fn session_window(events: &[CameraEvent], session_id: &str) -> Result<(i64, i64), Error> {
    let start = boundary(events, session_id, CameraEventKind::VideoStart, "video_start")?;
    let end = boundary(events, session_id, CameraEventKind::VideoEnd, "video_end")?;
    Ok((start, end))
}

// First occurrence wins; duplicates are a data-quality warning, not an error.
fn boundary(
    events: &[CameraEvent],
    session_id: &str,
    kind: CameraEventKind,
    name: &'static str,
) -> Result<i64, Error> {
    let mut timestamps = events
        .iter()
        .filter(|e| e.kind == kind && e.session_id.as_deref() == Some(session_id))
        .filter_map(|e| e.timestamp);

    let first = timestamps.next().ok_or(Error::MissingBoundaryEvent {
        event: name,
        session_id: session_id.to_string(),
    })?;

    if timestamps.next().is_some() {
        warn!(event = name, session_id, "duplicate boundary event; first occurrence wins");
    }

    Ok(first)
}

fn build_table(telemetry: Vec<TelemetryRecord>, start: i64, end: i64) -> TelemetryTable {
    let mut table: TelemetryTable = telemetry.into_iter().collect();
    table.forward_fill();
    table.retain_window(start, end);
    table
}
