//! Read-only archive member extraction.
//!
//! Archives need random access, so the whole archive is buffered before the
//! member is located. The member itself is buffered as well.

use crate::error::{Error, Result};
use crate::io::locator::Locator;
use crate::io::stream::{IoContext, read_bytes};
use std::io::{Cursor, Read};
use zip::ZipArchive;
use zip::result::ZipError;

/// Member name to extract: the explicit name if given, otherwise the archive's
/// file name without its `.zip` suffix (`data.csv.zip` → `data.csv`).
///
/// # Errors
/// Returns [`Error::UnsupportedOperation`] if no member name is given and none
/// can be inferred from the locator.
pub fn member_name(locator: &Locator, explicit: Option<&str>) -> Result<String> {
    if let Some(name) = explicit.filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }
    locator
        .file_name()
        .and_then(|n| {
            let lower = n.to_ascii_lowercase();
            lower
                .strip_suffix(".zip")
                .filter(|stem| !stem.is_empty())
                .map(|stem| n[..stem.len()].to_string())
        })
        .ok_or_else(|| {
            Error::UnsupportedOperation(format!(
                "cannot extract from archive {locator} without a member name"
            ))
        })
}

/// Extract one member from archive bytes.
///
/// # Errors
/// Returns [`Error::Decode`] if the bytes are not a valid archive or the
/// member is missing.
pub fn extract_member(archive: Vec<u8>, name: &str) -> Result<Vec<u8>> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).map_err(zip_error)?;
    let mut member = zip.by_name(name).map_err(|e| match e {
        ZipError::FileNotFound => Error::decode(format!("archive has no member named {name:?}")),
        other => zip_error(other),
    })?;
    let mut out = Vec::with_capacity(usize::try_from(member.size()).unwrap_or(0));
    member
        .read_to_end(&mut out)
        .map_err(|e| Error::io(format!("read archive member {name}"), e))?;
    Ok(out)
}

/// List member names of archive bytes, in archive order.
///
/// # Errors
/// Returns [`Error::Decode`] if the bytes are not a valid archive.
pub fn member_names(archive: Vec<u8>) -> Result<Vec<String>> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).map_err(zip_error)?;
    let mut names = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let entry = zip.by_index(i).map_err(zip_error)?;
        names.push(entry.name().to_string());
    }
    Ok(names)
}

/// List the members of the archive behind a locator.
///
/// # Errors
/// Returns read errors of the locator, or [`Error::Decode`] for invalid
/// archives.
pub fn names(locator: &Locator, ctx: &IoContext) -> Result<Vec<String>> {
    member_names(read_bytes(locator, ctx)?)
}

fn zip_error(e: ZipError) -> Error {
    match e {
        ZipError::Io(source) => Error::io("read archive", source),
        other => Error::decode(format!("invalid archive: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_member_from_archive_name() {
        let loc = Locator::parse("/data/export.CSV.zip").unwrap();
        assert_eq!(member_name(&loc, None).unwrap(), "export.CSV");
        assert_eq!(member_name(&loc, Some("other.csv")).unwrap(), "other.csv");

        let bare = Locator::parse("/data/export.bin").unwrap();
        assert!(matches!(
            member_name(&bare, None),
            Err(Error::UnsupportedOperation(_))
        ));
        assert!(matches!(
            member_name(&Locator::Stdio, Some("")),
            Err(Error::UnsupportedOperation(_))
        ));
    }
}
