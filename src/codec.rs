//! Mapping between model unique ids and their sharded archive directories.
//!
//! A unique id such as `0f86b938-15a3-4f1e-99b1-8f2b65b37a03` lives under
//! `0f/86/b9/38/15/a3/4f/1e/99/b1/8f/2b/65/b3/7a/03`: one directory level per
//! byte of the id, sixteen levels in total.

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::Uid;
use crate::error::M4dbError;

pub const SEGMENT_COUNT: usize = 16;

/// Offsets of the hyphens in the canonical 8-4-4-4-12 form.
const HYPHEN_OFFSETS: [usize; 4] = [8, 13, 18, 23];

pub fn encode_to_path(uid: &str) -> Result<Vec<String>, M4dbError> {
    let uid: Uid = uid.parse()?;
    Ok(uid.hex_pairs())
}

pub fn decode_from_path<I, S>(segments: I) -> Result<String, M4dbError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let segments: Vec<S> = segments.into_iter().collect();
    if segments.len() != SEGMENT_COUNT {
        return Err(M4dbError::InvalidSegmentCount(segments.len()));
    }

    let mut uid = String::with_capacity(36);
    for segment in &segments {
        let segment = segment.as_ref();
        if !is_hex_pair(segment) {
            return Err(M4dbError::InvalidHexPair(segment.to_string()));
        }
        if HYPHEN_OFFSETS.contains(&uid.len()) {
            uid.push('-');
        }
        uid.push_str(segment);
    }
    Ok(uid)
}

/// Splits `path` into its ordered components. The root of an absolute path is
/// kept as a leading `/` component.
pub fn split_path(path: &Utf8Path) -> Vec<String> {
    path.components()
        .map(|component| component.as_str().to_string())
        .collect()
}

pub fn uid_to_dir(uid: &str) -> Result<Utf8PathBuf, M4dbError> {
    Ok(encode_to_path(uid)?.iter().collect())
}

pub fn dir_to_uid(path: &Utf8Path) -> Result<String, M4dbError> {
    decode_from_path(split_path(path))
}

/// Decodes an archive directory that may be given relative to `root` or
/// prefixed by it.
pub fn dir_to_uid_under(root: &Utf8Path, path: &Utf8Path) -> Result<String, M4dbError> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    dir_to_uid(relative)
}

fn is_hex_pair(segment: &str) -> bool {
    segment.len() == 2 && segment.bytes().all(|byte| byte.is_ascii_hexdigit())
}
