use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::Error;
use crate::fit::{DecodedLog, decode_fit_file};

/// A candidate FIT file whose camera events carry the target session uuid,
/// together with its full decode result.
#[derive(Debug)]
pub struct MatchedLog {
    pub path: PathBuf,
    pub log: DecodedLog,
}

/// Scan `dir` for the FIT file recorded alongside the video tagged
/// `session_id`.
///
/// Candidates are taken in lexicographic file-name order so the "first
/// qualifying match wins" rule is deterministic. A candidate that fails to
/// decode is skipped with a warning; the scan only fails outright when the
/// directory has no `.fit` files at all or every candidate is unreadable.
/// `Ok(None)` means no candidate carries the uuid.
pub fn find_matching_fit(dir: &Path, session_id: &str) -> Result<Option<MatchedLog>, Error> {
    let candidates = list_candidates(dir)?;
    if candidates.is_empty() {
        return Err(Error::NoFitFiles {
            dir: dir.to_path_buf(),
        });
    }

    scan_candidates(candidates, session_id, dir, decode_fit_file)
}

/// Directory entries with a `.fit` extension (ASCII case-insensitive), sorted
/// by file name.
fn list_candidates(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("fit"))
        })
        .collect();

    candidates.sort();
    Ok(candidates)
}

// Linear scan with early exit; decode is injected so tests can substitute
// synthetic logs for real FIT bytes.
fn scan_candidates(
    candidates: Vec<PathBuf>,
    session_id: &str,
    dir: &Path,
    mut decode: impl FnMut(&Path) -> Result<DecodedLog, Error>,
) -> Result<Option<MatchedLog>, Error> {
    let attempted = candidates.len();
    let mut failures = 0usize;

    for path in candidates {
        let log = match decode(&path) {
            Ok(log) => log,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable fit candidate");
                failures += 1;
                continue;
            }
        };

        if log.contains_session(session_id) {
            debug!(path = %path.display(), session_id, "matched fit file");
            return Ok(Some(MatchedLog { path, log }));
        }
    }

    if failures == attempted {
        return Err(Error::AllCandidatesUnreadable {
            dir: dir.to_path_buf(),
            attempted,
        });
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::{CameraEvent, CameraEventKind};
    use std::fs::File;

    fn log_with_session(session_id: &str) -> DecodedLog {
        DecodedLog {
            events: vec![CameraEvent {
                kind: CameraEventKind::VideoStart,
                session_id: Some(session_id.to_string()),
                timestamp: Some(0),
            }],
            telemetry: Vec::new(),
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn returns_first_candidate_carrying_target() {
        let found = scan_candidates(
            paths(&["a.fit", "b.fit", "c.fit"]),
            "ABC123",
            Path::new("logs"),
            |path| {
                Ok(match path.to_str().unwrap() {
                    "a.fit" => log_with_session("XYZ"),
                    "b.fit" => log_with_session("OTHER"),
                    _ => log_with_session("ABC123"),
                })
            },
        )
        .unwrap()
        .unwrap();

        assert_eq!(found.path, PathBuf::from("c.fit"));
    }

    #[test]
    fn no_match_returns_none_without_error() {
        let found = scan_candidates(
            paths(&["a.fit", "b.fit"]),
            "ABC123",
            Path::new("logs"),
            |_| Ok(log_with_session("XYZ")),
        )
        .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn unreadable_candidate_is_skipped() {
        let found = scan_candidates(
            paths(&["bad.fit", "good.fit"]),
            "ABC123",
            Path::new("logs"),
            |path| {
                if path.to_str().unwrap() == "bad.fit" {
                    Err(Error::FitDecode {
                        path: path.to_path_buf(),
                        message: "truncated".into(),
                    })
                } else {
                    Ok(log_with_session("ABC123"))
                }
            },
        )
        .unwrap()
        .unwrap();

        assert_eq!(found.path, PathBuf::from("good.fit"));
    }

    #[test]
    fn all_unreadable_escalates() {
        let err = scan_candidates(
            paths(&["a.fit", "b.fit"]),
            "ABC123",
            Path::new("logs"),
            |path| {
                Err(Error::FitDecode {
                    path: path.to_path_buf(),
                    message: "truncated".into(),
                })
            },
        )
        .unwrap_err();

        assert!(matches!(
            err,
            Error::AllCandidatesUnreadable { attempted: 2, .. }
        ));
    }

    #[test]
    fn empty_directory_is_a_contract_violation() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_matching_fit(dir.path(), "ABC123").unwrap_err();
        assert!(matches!(err, Error::NoFitFiles { .. }));
    }

    #[test]
    fn candidate_listing_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.fit", "a.FIT", "notes.txt", "c.fit"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let names: Vec<String> = list_candidates(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.FIT", "b.fit", "c.fit"]);
    }
}
