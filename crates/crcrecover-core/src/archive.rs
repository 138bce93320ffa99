//! ZIP central-directory listing.
//!
//! Only metadata is read: the end-of-central-directory record (EOCD), the
//! ZIP64 locator and record when present, and the central directory itself.
//! Entry data is never touched, so encrypted or unsupported compression
//! methods do not matter.
//!
//! ## Layout
//!
//! 1. Search the last 64 KiB + 22 bytes of the file backwards for the EOCD
//! 2. If a ZIP64 locator sits right before it, take the 64-bit counts from
//!    the ZIP64 EOCD record it points to
//! 3. Read the central directory and decode one header per entry, using the
//!    ZIP64 extended-information extra field for sizes stored as `0xFFFFFFFF`

use crate::error::{Error, Result};
use bytes::Buf;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};

const SIG_EOCD: u32 = 0x0605_4b50;
const SIG_ZIP64_EOCD: u32 = 0x0606_4b50;
const SIG_ZIP64_LOCATOR: u32 = 0x0706_4b50;
const SIG_CENTRAL: u32 = 0x0201_4b50;

const EOCD_LEN: usize = 22;
const ZIP64_LOCATOR_LEN: usize = 20;
const ZIP64_EOCD_LEN: usize = 56;
const CENTRAL_HEADER_LEN: usize = 46;
const MAX_COMMENT_LEN: usize = u16::MAX as usize;

const ZIP64_EXTRA_ID: u16 = 0x0001;
const FLAG_UTF8: u16 = 1 << 11;

/// Metadata for one archive member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Member path inside the archive
    pub name: String,
    /// Size of the member's content in bytes
    pub uncompressed_size: u64,
    /// CRC32 of the member's content
    pub checksum: u32,
}

impl ArchiveEntry {
    /// Creates a new archive entry
    pub fn new(name: impl Into<String>, uncompressed_size: u64, checksum: u32) -> Self {
        Self {
            name: name.into(),
            uncompressed_size,
            checksum,
        }
    }

    /// Returns true for directory entries
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// Location of the central directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CentralDirectory {
    offset: u64,
    size: u64,
    entries: u64,
}

/// Lists every entry in the ZIP archive at `path`, in central-directory order
pub fn list_entries(path: impl AsRef<Path>) -> Result<Vec<ArchiveEntry>> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| Error::archive_open(path, e))?;
    let entries = read_entries(&mut file, path)?;
    debug!("Listed {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Sorts entries by size, then name
pub fn sort_entries(entries: &mut [ArchiveEntry]) {
    entries.sort_by(|a, b| {
        a.uncompressed_size
            .cmp(&b.uncompressed_size)
            .then_with(|| a.name.cmp(&b.name))
    });
}

fn read_entries<R: Read + Seek>(reader: &mut R, path: &Path) -> Result<Vec<ArchiveEntry>> {
    let io_err = |e: io::Error| Error::archive_open(path, e);

    let file_len = reader.seek(SeekFrom::End(0)).map_err(io_err)?;
    let dir = locate_central_directory(reader, file_len).map_err(|e| match e {
        Located::Io(e) => io_err(e),
        Located::Format(e) => e,
    })?;
    trace!(
        "Central directory at {} ({} bytes, {} entries)",
        dir.offset,
        dir.size,
        dir.entries
    );

    let raw = read_at(reader, dir.offset, dir.size as usize).map_err(io_err)?;
    parse_central_directory(&raw, dir)
}

enum Located {
    Io(io::Error),
    Format(Error),
}

impl From<io::Error> for Located {
    fn from(e: io::Error) -> Self {
        Located::Io(e)
    }
}

impl From<Error> for Located {
    fn from(e: Error) -> Self {
        Located::Format(e)
    }
}

fn locate_central_directory<R: Read + Seek>(
    reader: &mut R,
    file_len: u64,
) -> std::result::Result<CentralDirectory, Located> {
    if file_len < EOCD_LEN as u64 {
        return Err(Error::archive_format(0, "file too small to be a zip archive").into());
    }

    let window_len = file_len.min((EOCD_LEN + MAX_COMMENT_LEN) as u64) as usize;
    let window_off = file_len - window_len as u64;
    let window = read_at(reader, window_off, window_len)?;

    let eocd_rel = find_eocd(&window)
        .ok_or_else(|| Error::archive_format(file_len, "end of central directory not found"))?;
    let eocd_off = window_off + eocd_rel as u64;

    let mut eocd = &window[eocd_rel + 4..];
    let disk = eocd.get_u16_le();
    let cd_disk = eocd.get_u16_le();
    let entries_disk = eocd.get_u16_le();
    let entries_total = eocd.get_u16_le();
    let cd_size = eocd.get_u32_le();
    let cd_off = eocd.get_u32_le();

    if disk != 0 || cd_disk != 0 || entries_disk != entries_total {
        return Err(Error::archive_format(eocd_off, "multi-disk archives are not supported").into());
    }

    let mut dir = CentralDirectory {
        offset: u64::from(cd_off),
        size: u64::from(cd_size),
        entries: u64::from(entries_total),
    };
    let mut dir_end = eocd_off;

    if let Some(z64) = read_zip64_directory(reader, eocd_off)? {
        dir_end = z64.1;
        dir = z64.0;
    }

    match dir.offset.checked_add(dir.size) {
        Some(end) if end <= dir_end => Ok(dir),
        _ => Err(Error::archive_format(
            dir.offset,
            format!("central directory of {} bytes overruns the archive", dir.size),
        )
        .into()),
    }
}

/// Reads the ZIP64 EOCD record if a locator precedes the EOCD at `eocd_off`
///
/// Returns the directory location and the record's own offset.
fn read_zip64_directory<R: Read + Seek>(
    reader: &mut R,
    eocd_off: u64,
) -> std::result::Result<Option<(CentralDirectory, u64)>, Located> {
    let Some(locator_off) = eocd_off.checked_sub(ZIP64_LOCATOR_LEN as u64) else {
        return Ok(None);
    };
    let locator = read_at(reader, locator_off, ZIP64_LOCATOR_LEN)?;
    let mut locator = &locator[..];
    if locator.get_u32_le() != SIG_ZIP64_LOCATOR {
        return Ok(None);
    }
    let z64_disk = locator.get_u32_le();
    let z64_off = locator.get_u64_le();
    let total_disks = locator.get_u32_le();
    if z64_disk != 0 || total_disks > 1 {
        return Err(Error::archive_format(locator_off, "multi-disk archives are not supported").into());
    }
    if z64_off.saturating_add(ZIP64_EOCD_LEN as u64) > locator_off {
        return Err(Error::archive_format(z64_off, "zip64 end of central directory out of range").into());
    }

    let record = read_at(reader, z64_off, ZIP64_EOCD_LEN)?;
    let mut record = &record[..];
    if record.get_u32_le() != SIG_ZIP64_EOCD {
        return Err(Error::archive_format(z64_off, "bad zip64 end of central directory signature").into());
    }
    record.advance(8 + 2 + 2); // record size, versions
    let disk = record.get_u32_le();
    let cd_disk = record.get_u32_le();
    let entries_disk = record.get_u64_le();
    let entries_total = record.get_u64_le();
    let cd_size = record.get_u64_le();
    let cd_off = record.get_u64_le();

    if disk != 0 || cd_disk != 0 || entries_disk != entries_total {
        return Err(Error::archive_format(z64_off, "multi-disk archives are not supported").into());
    }

    trace!("Using zip64 end of central directory at {}", z64_off);
    Ok(Some((
        CentralDirectory {
            offset: cd_off,
            size: cd_size,
            entries: entries_total,
        },
        z64_off,
    )))
}

/// Finds the EOCD record in the tail `window` of the archive
///
/// A record whose comment ends exactly at the end of the file wins; failing
/// that, the last signature whose comment fits is taken, which tolerates
/// trailing junk after the archive.
fn find_eocd(window: &[u8]) -> Option<usize> {
    let last = window.len().checked_sub(EOCD_LEN)?;
    let candidates: Vec<(usize, usize)> = (0..=last)
        .rev()
        .filter_map(|i| {
            let mut rec = &window[i..];
            if rec.get_u32_le() != SIG_EOCD {
                return None;
            }
            rec.advance(16);
            let end = i + EOCD_LEN + rec.get_u16_le() as usize;
            (end <= window.len()).then_some((i, end))
        })
        .collect();

    candidates
        .iter()
        .find(|&&(_, end)| end == window.len())
        .or_else(|| candidates.first())
        .map(|&(i, _)| i)
}

fn parse_central_directory(raw: &[u8], dir: CentralDirectory) -> Result<Vec<ArchiveEntry>> {
    let mut buf = raw;
    let mut entries = Vec::with_capacity(dir.entries.min(u16::MAX as u64) as usize);
    let offset_of = |buf: &[u8]| dir.offset + (raw.len() - buf.len()) as u64;

    for _ in 0..dir.entries {
        let header_off = offset_of(buf);
        if buf.remaining() < CENTRAL_HEADER_LEN {
            return Err(Error::archive_format(header_off, "truncated central directory header"));
        }
        if buf.get_u32_le() != SIG_CENTRAL {
            return Err(Error::archive_format(header_off, "bad central directory header signature"));
        }

        buf.advance(2 + 2); // versions
        let flags = buf.get_u16_le();
        buf.advance(2 + 2 + 2); // method, time, date
        let checksum = buf.get_u32_le();
        let _compressed = buf.get_u32_le();
        let uncompressed = buf.get_u32_le();
        let name_len = buf.get_u16_le() as usize;
        let extra_len = buf.get_u16_le() as usize;
        let comment_len = buf.get_u16_le() as usize;
        buf.advance(2 + 2 + 4 + 4); // disk start, attributes, local header offset

        if buf.remaining() < name_len + extra_len + comment_len {
            return Err(Error::archive_format(header_off, "central directory entry overruns directory"));
        }

        let name_bytes = &buf[..name_len];
        let name = if flags & FLAG_UTF8 != 0 {
            String::from_utf8(name_bytes.to_vec()).map_err(|_| {
                Error::archive_format(header_off, "entry name flagged UTF-8 is not valid UTF-8")
            })?
        } else {
            String::from_utf8_lossy(name_bytes).into_owned()
        };
        buf.advance(name_len);

        let extra = &buf[..extra_len];
        let uncompressed_size = if uncompressed == u32::MAX {
            zip64_uncompressed_size(extra).ok_or_else(|| {
                Error::archive_format(header_off, format!("entry '{}' lacks zip64 size field", name))
            })?
        } else {
            u64::from(uncompressed)
        };
        buf.advance(extra_len + comment_len);

        trace!("Entry '{}': {} bytes, crc {:08x}", name, uncompressed_size, checksum);
        entries.push(ArchiveEntry {
            name,
            uncompressed_size,
            checksum,
        });
    }

    Ok(entries)
}

/// Uncompressed size from a ZIP64 extended-information extra field
///
/// The size is the first value in the field whenever the header's 32-bit
/// uncompressed size is saturated.
fn zip64_uncompressed_size(mut extra: &[u8]) -> Option<u64> {
    while extra.remaining() >= 4 {
        let id = extra.get_u16_le();
        let len = extra.get_u16_le() as usize;
        if extra.remaining() < len {
            return None;
        }
        if id == ZIP64_EXTRA_ID {
            let mut field = &extra[..len];
            return (field.remaining() >= 8).then(|| field.get_u64_le());
        }
        extra.advance(len);
    }
    None
}

fn read_at<R: Read + Seek>(reader: &mut R, offset: u64, len: usize) -> io::Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    const SIG_LOCAL: u32 = 0x0403_4b50;

    /// Builds a stored (uncompressed) archive
    fn build_zip(files: &[(&str, &[u8])], comment: &[u8], zip64: bool) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        let mut central: Vec<u8> = Vec::new();

        for (name, data) in files {
            let local_off = out.len() as u32;
            let crc = crc32fast::hash(data);
            let len = data.len() as u32;

            out.put_u32_le(SIG_LOCAL);
            out.put_u16_le(20);
            out.put_u16_le(0);
            out.put_u16_le(0);
            out.put_u16_le(0);
            out.put_u16_le(0);
            out.put_u32_le(crc);
            out.put_u32_le(len);
            out.put_u32_le(len);
            out.put_u16_le(name.len() as u16);
            out.put_u16_le(0);
            out.put_slice(name.as_bytes());
            out.put_slice(data);

            let size_field = if zip64 { u32::MAX } else { len };
            central.put_u32_le(SIG_CENTRAL);
            central.put_u16_le(45);
            central.put_u16_le(45);
            central.put_u16_le(FLAG_UTF8);
            central.put_u16_le(0);
            central.put_u16_le(0);
            central.put_u16_le(0);
            central.put_u32_le(crc);
            central.put_u32_le(size_field);
            central.put_u32_le(size_field);
            central.put_u16_le(name.len() as u16);
            central.put_u16_le(if zip64 { 20 } else { 0 });
            central.put_u16_le(0);
            central.put_u16_le(0);
            central.put_u16_le(0);
            central.put_u32_le(0);
            central.put_u32_le(local_off);
            central.put_slice(name.as_bytes());
            if zip64 {
                central.put_u16_le(ZIP64_EXTRA_ID);
                central.put_u16_le(16);
                central.put_u64_le(data.len() as u64);
                central.put_u64_le(data.len() as u64);
            }
        }

        let cd_off = out.len() as u64;
        let cd_size = central.len() as u64;
        let count = files.len() as u64;
        out.extend_from_slice(&central);

        if zip64 {
            let z64_off = out.len() as u64;
            out.put_u32_le(SIG_ZIP64_EOCD);
            out.put_u64_le((ZIP64_EOCD_LEN - 12) as u64);
            out.put_u16_le(45);
            out.put_u16_le(45);
            out.put_u32_le(0);
            out.put_u32_le(0);
            out.put_u64_le(count);
            out.put_u64_le(count);
            out.put_u64_le(cd_size);
            out.put_u64_le(cd_off);

            out.put_u32_le(SIG_ZIP64_LOCATOR);
            out.put_u32_le(0);
            out.put_u64_le(z64_off);
            out.put_u32_le(1);
        }

        out.put_u32_le(SIG_EOCD);
        out.put_u16_le(0);
        out.put_u16_le(0);
        let (n, size, off) = if zip64 {
            (u16::MAX, u32::MAX, u32::MAX)
        } else {
            (count as u16, cd_size as u32, cd_off as u32)
        };
        out.put_u16_le(n);
        out.put_u16_le(n);
        out.put_u32_le(size);
        out.put_u32_le(off);
        out.put_u16_le(comment.len() as u16);
        out.put_slice(comment);
        out
    }

    fn write_temp(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn read_bytes(bytes: Vec<u8>) -> Result<Vec<ArchiveEntry>> {
        read_entries(&mut Cursor::new(bytes), Path::new("memory.zip"))
    }

    #[test]
    fn test_list_entries() {
        let zip = build_zip(&[("a.txt", b"hey"), ("dir/b.txt", b"")], b"", false);
        let file = write_temp(&zip);
        let entries = list_entries(file.path()).unwrap();
        assert_eq!(
            entries,
            vec![
                ArchiveEntry::new("a.txt", 3, crc32fast::hash(b"hey")),
                ArchiveEntry::new("dir/b.txt", 0, 0),
            ]
        );
    }

    #[test]
    fn test_trailing_comment() {
        let comment = b"archive comment mentioning PK\x05\x06 inside";
        let entries = read_bytes(build_zip(&[("x", b"12")], comment, false)).unwrap();
        assert_eq!(entries, vec![ArchiveEntry::new("x", 2, crc32fast::hash(b"12"))]);
    }

    #[test]
    fn test_fake_eocd_in_comment() {
        let mut comment = b"PK\x05\x06".to_vec();
        comment.extend_from_slice(&[0u8; 18]);
        comment.extend_from_slice(b"tail of the comment");
        let entries = read_bytes(build_zip(&[("x", b"12")], &comment, false)).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_trailing_junk() {
        let mut zip = build_zip(&[("x", b"12")], b"", false);
        zip.extend_from_slice(b"junk appended after the archive");
        let entries = read_bytes(zip).unwrap();
        assert_eq!(entries, vec![ArchiveEntry::new("x", 2, crc32fast::hash(b"12"))]);
    }

    #[test]
    fn test_zip64_records() {
        let entries = read_bytes(build_zip(&[("big.bin", b"abcd"), ("c", b"z")], b"", true)).unwrap();
        assert_eq!(
            entries,
            vec![
                ArchiveEntry::new("big.bin", 4, crc32fast::hash(b"abcd")),
                ArchiveEntry::new("c", 1, crc32fast::hash(b"z")),
            ]
        );
    }

    #[test]
    fn test_empty_archive() {
        assert!(read_bytes(build_zip(&[], b"", false)).unwrap().is_empty());
    }

    #[test]
    fn test_not_a_zip() {
        let err = read_bytes(b"definitely not a zip archive, just text".to_vec()).unwrap_err();
        assert!(matches!(err, Error::ArchiveFormat { .. }));

        let err = read_bytes(b"PK".to_vec()).unwrap_err();
        assert!(matches!(err, Error::ArchiveFormat { .. }));
    }

    #[test]
    fn test_corrupt_central_directory() {
        let mut zip = build_zip(&[("a.txt", b"hey")], b"", false);
        let cd_start = 30 + "a.txt".len() + 3;
        zip[cd_start] ^= 0xFF;
        let err = read_bytes(zip).unwrap_err();
        assert!(matches!(err, Error::ArchiveFormat { .. }));
    }

    #[test]
    fn test_directory_overrun() {
        let mut zip = build_zip(&[("a.txt", b"hey")], b"", false);
        let len = zip.len();
        // cd_size field of the EOCD
        zip[len - 10..len - 6].copy_from_slice(&0x00FF_FFFFu32.to_le_bytes());
        let err = read_bytes(zip).unwrap_err();
        assert!(matches!(err, Error::ArchiveFormat { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_entries(dir.path().join("missing.zip")).unwrap_err();
        assert!(matches!(err, Error::ArchiveOpen { .. }));
    }

    #[test]
    fn test_sort_entries() {
        let mut entries = vec![
            ArchiveEntry::new("b", 5, 0),
            ArchiveEntry::new("z", 1, 0),
            ArchiveEntry::new("a", 5, 0),
        ];
        sort_entries(&mut entries);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "b"]);
    }

    #[test]
    fn test_is_dir() {
        assert!(ArchiveEntry::new("docs/", 0, 0).is_dir());
        assert!(!ArchiveEntry::new("docs/a", 0, 0).is_dir());
    }
}
