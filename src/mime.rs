//! MIME type sniffing from a file's leading bytes
//!
//! A fixed, ordered table of magic-byte signatures is checked against the
//! first [`HEADER_BYTES_TO_IDENTIFY_MIME_TYPE`] bytes of a file. Earlier
//! entries win. Container formats (ISO media boxes, ZIP) look one step
//! further, at a brand code or at the filename, to pick a subtype. When
//! nothing matches, printable ASCII counts as text and anything else is
//! opaque binary.

use crate::Result;
use std::io::Read;
use std::path::Path;

/// How many leading bytes the classifier looks at
pub const HEADER_BYTES_TO_IDENTIFY_MIME_TYPE: usize = 28;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_CALENDAR: &str = "text/calendar";

const ICS_MARKER: &[u8] = b"BEGIN:VCALENDAR";

/// What a matching signature means
enum Verdict {
    /// The signature alone decides
    Is(&'static str),
    /// A second look decides; `None` lets later signatures have a go
    Refine(fn(&[u8], &str) -> Option<&'static str>),
}

struct Signature {
    offset: usize,
    magic: &'static [u8],
    verdict: Verdict,
}

const fn sig(offset: usize, magic: &'static [u8], mime: &'static str) -> Signature {
    Signature {
        offset,
        magic,
        verdict: Verdict::Is(mime),
    }
}

const fn refine(
    offset: usize,
    magic: &'static [u8],
    f: fn(&[u8], &str) -> Option<&'static str>,
) -> Signature {
    Signature {
        offset,
        magic,
        verdict: Verdict::Refine(f),
    }
}

/// Ordered by priority
const SIGNATURES: &[Signature] = &[
    // images
    sig(0, b"BM", "image/bmp"),
    sig(0, b"GIF", "image/gif"),
    sig(0, &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a], "image/png"),
    sig(0, &[0xff, 0xd8], "image/jpg"),
    sig(0, &[0, 0, 1, 0], "image/x-icon"),
    sig(0, &[0, 0, 2, 0], "image/x-icon"),
    // many browsers can't show tiff
    sig(0, &[b'I', b'I', 0x2a, 0], "image/tiff"),
    sig(0, &[b'M', b'M', 0, 0x2a], "image/tiff"),
    // video
    refine(4, b"ftyp", iso_media_brand),
    sig(24, b"webm", "video/webm"),
    sig(0, &[b'O', b'g', b'g', b'S', 0, 2], "video/ogg"),
    sig(0, &[0x1a, 0x45, 0xdf, 0xa3], "video/x-matroska"),
    sig(0, b"FLV", "video/x-flv"),
    sig(8, b"AVI ", "video/avi"),
    // audio
    sig(0, b"ID3", "audio/mpeg"),
    sig(0, &[0xff, 0xfb], "audio/mpeg"),
    sig(0, &[0xff, 0xfa], "audio/mpeg"),
    refine(0, b"RIFF", riff_wave),
    // documents and archives
    sig(0, b"%PDF", "application/pdf"),
    refine(0, &[b'P', b'K', 3, 4], zip_by_extension),
];

fn matches_at(prefix: &[u8], offset: usize, magic: &[u8]) -> bool {
    offset
        .checked_add(magic.len())
        .and_then(|end| prefix.get(offset..end))
        .map_or(false, |window| window == magic)
}

fn iso_media_brand(prefix: &[u8], _filename: &str) -> Option<&'static str> {
    const BRANDS: &[(&[u8], &str)] = &[
        (b"iso2", "video/mp4"),
        (b"isom", "video/mp4"),
        (b"mp42", "video/mp4"),
        (b"mp41", "video/mp4"),
        (b"M4A ", "audio/mp4"),
        (b"qt  ", "video/quicktime"),
        (b"3gp", "video/3gpp"),
    ];
    BRANDS
        .iter()
        .find(|(brand, _)| matches_at(prefix, 8, brand))
        .map(|(_, mime)| *mime)
}

fn riff_wave(prefix: &[u8], _filename: &str) -> Option<&'static str> {
    matches_at(prefix, 8, b"WAVE").then_some("audio/wav")
}

fn zip_by_extension(_prefix: &[u8], filename: &str) -> Option<&'static str> {
    const BY_EXTENSION: &[(&str, &str)] = &[
        (".jar", "application/java-archive"),
        (
            ".pptx",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ),
        (
            ".docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ),
        (
            ".xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
        (".odt", "application/vnd.oasis.opendocument.text"),
        (".ods", "application/vnd.oasis.opendocument.spreadsheet"),
        (".odp", "application/vnd.oasis.opendocument.presentation"),
    ];
    let name = filename.to_ascii_lowercase();
    let mime = BY_EXTENSION
        .iter()
        .find(|(ext, _)| name.ends_with(ext))
        .map_or("application/zip", |(_, mime)| *mime);
    Some(mime)
}

/// Printable ASCII plus LF and CR
fn is_plain_text(prefix: &[u8]) -> bool {
    prefix
        .iter()
        .all(|&b| b < 0x80 && (b >= 0x20 || b == b'\n' || b == b'\r'))
}

/// Best-effort MIME type for content starting with `prefix`
///
/// Never fails: short or empty prefixes simply don't match signatures
/// that need more bytes.
pub fn classify(prefix: &[u8], filename: &str) -> &'static str {
    for signature in SIGNATURES {
        if !matches_at(prefix, signature.offset, signature.magic) {
            continue;
        }
        match signature.verdict {
            Verdict::Is(mime) => return mime,
            Verdict::Refine(f) => {
                if let Some(mime) = f(prefix, filename) {
                    return mime;
                }
            }
        }
    }

    if is_plain_text(prefix) {
        if filename.to_ascii_lowercase().ends_with(".ics") && prefix.starts_with(ICS_MARKER) {
            return TEXT_CALENDAR;
        }
        return TEXT_PLAIN;
    }

    OCTET_STREAM
}

/// Classify a file on disk by reading its first bytes
pub fn classify_file(path: impl AsRef<Path>) -> Result<&'static str> {
    let path = path.as_ref();
    let mut prefix = Vec::with_capacity(HEADER_BYTES_TO_IDENTIFY_MIME_TYPE);
    std::fs::File::open(path)?
        .take(HEADER_BYTES_TO_IDENTIFY_MIME_TYPE as u64)
        .read_to_end(&mut prefix)?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(classify(&prefix, &filename))
}
