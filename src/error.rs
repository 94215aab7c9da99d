use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Passthrough for IO errors (open/read/seek/list).
    #[error(transparent)]
    Io(#[from] io::Error),

    /// MP4 structure is malformed or violates expected ISO-BMFF invariants.
    #[error("mp4 parse error in {context}: box {box_type} at offset {offset}: {message}")]
    Mp4InvalidBox {
        context: String,
        box_type: String,
        offset: u64,
        message: String,
    },

    /// A FIT file could not be decoded by the record codec.
    #[error("fit decode error in {path}: {message}", path = .path.display())]
    FitDecode { path: PathBuf, message: String },

    /// The video carries no session uuid under moov/udta/uuid.
    #[error("video {video} does not contain a session uuid", video = .video.display())]
    NoSessionId { video: PathBuf },

    /// The directory contains no candidate .fit files at all.
    #[error("no .fit files found in {dir}", dir = .dir.display())]
    NoFitFiles { dir: PathBuf },

    /// Every candidate .fit file in the directory failed to decode.
    #[error(
        "all {attempted} candidate .fit files in {dir} failed to decode",
        dir = .dir.display()
    )]
    AllCandidatesUnreadable { dir: PathBuf, attempted: usize },

    /// No candidate .fit file carried the video's session uuid.
    #[error("no .fit file in {dir} matches session uuid {session_id}", dir = .dir.display())]
    NoMatchingFit { session_id: String, dir: PathBuf },

    /// The matched FIT file lacks a start or end camera event for the session.
    #[error("fit file has no {event} camera event for session uuid {session_id}")]
    MissingBoundaryEvent {
        event: &'static str,
        session_id: String,
    },
}
