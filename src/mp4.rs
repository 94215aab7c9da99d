use std::io::{self, Read, Seek, SeekFrom};

use tracing::trace;

use crate::Error;

// -----------------------------
// MP4 parsing (minimal ISO-BMFF)
// -----------------------------
//
// We only need enough of the box grammar to walk one nested path and pull the
// session uuid out of the terminal box. Cameras write the uuid under
// moov -> udta -> uuid as a fixed-length text payload.

/// Box path under which the camera stores the session uuid.
pub const SESSION_UUID_PATH: [&str; 3] = ["moov", "udta", "uuid"];

/// The uuid box payload is a fixed 95 bytes of text immediately after the box
/// name. This is a format constant of the producer, not derived from the box
/// length, so we validate the declared length against it before reading.
pub const SESSION_UUID_LEN: usize = 95;

fn read_be_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_be_bytes(b))
}

fn read_be_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(u64::from_be_bytes(b))
}

#[derive(Debug, Clone)]
struct BoxHeader {
    typ: [u8; 4],
    size: u64,
    header_len: u64,
}

fn read_box_header<R: Read>(r: &mut R) -> io::Result<BoxHeader> {
    let size32 = read_be_u32(r)? as u64;
    let mut typ = [0u8; 4];
    r.read_exact(&mut typ)?;
    if size32 == 1 {
        // largesize
        let size64 = read_be_u64(r)?;
        Ok(BoxHeader {
            typ,
            size: size64,
            header_len: 16,
        })
    } else {
        Ok(BoxHeader {
            typ,
            size: size32,
            header_len: 8,
        })
    }
}

fn fourcc(s: &str) -> [u8; 4] {
    let b = s.as_bytes();
    [b[0], b[1], b[2], b[3]]
}

fn fourcc_to_string(t: [u8; 4]) -> String {
    // Best-effort display for debugging.
    t.iter()
        .map(|&c| if c.is_ascii_graphic() { c as char } else { '.' })
        .collect()
}

fn safe_box_end(ctx: &str, start: u64, hdr: &BoxHeader, limit: u64) -> Result<u64, Error> {
    // ISO-BMFF: size==0 means "extends to end of file" (or end of the containing box).
    let mut size = hdr.size;
    if size == 0 {
        size = limit.saturating_sub(start);
    }
    if size < hdr.header_len {
        return Err(Error::Mp4InvalidBox {
            context: ctx.to_string(),
            box_type: fourcc_to_string(hdr.typ),
            offset: start,
            message: format!("size {size} < header_len {}", hdr.header_len),
        });
    }

    let mut end = start.saturating_add(size);

    // Clamp to containing limit to avoid seeking past boundaries on malformed files.
    if end > limit {
        end = limit;
    }

    // Guarantee forward progress.
    if end <= start {
        return Err(Error::Mp4InvalidBox {
            context: ctx.to_string(),
            box_type: fourcc_to_string(hdr.typ),
            offset: start,
            message: format!("non-advancing end {end}"),
        });
    }

    Ok(end)
}

/// Walk `path` through the nested box tree and return the session uuid stored
/// in the terminal box, or `None` if any level of the path is absent.
///
/// A missing box is a recoverable "video has no session tag" condition, not an
/// error; only framing violations (lengths that do not advance, a uuid box too
/// small for its fixed payload, non-UTF-8 payload) are surfaced as errors.
pub fn find_session_uuid<R: Read + Seek>(
    f: &mut R,
    path: &[&str],
) -> Result<Option<String>, Error> {
    let file_len = f.seek(SeekFrom::End(0))?;
    let mut pos = 0u64;
    let mut limit = file_len;

    for (depth, name) in path.iter().enumerate() {
        let terminal = depth == path.len() - 1;
        let want = fourcc(name);
        let mut found = false;

        // Scan sibling boxes at the current nesting level.
        while pos + 8 <= limit {
            f.seek(SeekFrom::Start(pos))?;
            let hdr = read_box_header(f)?;
            let start = pos;
            trace!(
                context = %name,
                pos = start,
                typ = %fourcc_to_string(hdr.typ),
                size = hdr.size,
                limit,
                "mp4 box"
            );
            let end = safe_box_end(name, start, &hdr, limit)?;
            let payload_start = start + hdr.header_len;

            if hdr.typ == want {
                if terminal {
                    return read_uuid_payload(f, name, &hdr, start, end, payload_start)
                        .map(Some);
                }
                // Descend: the payload becomes the next nesting level.
                pos = payload_start;
                limit = end;
                found = true;
                break;
            }

            pos = end;
        }

        if !found {
            return Ok(None);
        }
    }

    Ok(None)
}

fn read_uuid_payload<R: Read + Seek>(
    f: &mut R,
    ctx: &str,
    hdr: &BoxHeader,
    start: u64,
    end: u64,
    payload_start: u64,
) -> Result<String, Error> {
    // The fixed payload length is not carried by the box itself; refuse boxes
    // whose declared extent cannot hold it rather than reading garbage.
    if end < payload_start + SESSION_UUID_LEN as u64 {
        return Err(Error::Mp4InvalidBox {
            context: ctx.to_string(),
            box_type: fourcc_to_string(hdr.typ),
            offset: start,
            message: format!(
                "box too small for {SESSION_UUID_LEN}-byte uuid payload (end={end})"
            ),
        });
    }

    let mut buf = [0u8; SESSION_UUID_LEN];
    f.seek(SeekFrom::Start(payload_start))?;
    f.read_exact(&mut buf)?;

    String::from_utf8(buf.to_vec()).map_err(|_| Error::Mp4InvalidBox {
        context: ctx.to_string(),
        box_type: fourcc_to_string(hdr.typ),
        offset: start,
        message: "uuid payload is not valid UTF-8".to_string(),
    })
}
