// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Format-tolerant archive unpacking.
//!
//! Reference databases arrive as tar.gz or zip archives whose interesting
//! member is the one binary database file, or as zip archives full of CSV
//! files for bulk imports. The unpackers here walk to the member of interest
//! and write it at a caller-chosen path; they never touch a live reader.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::EntryType;

use crate::UpdateError;

/// Whether an archive member looks like an extractable database file.
fn is_database_member(name: &str) -> bool {
    name.contains("mmdb") || name.contains("BIN")
}

/// Rejects archives below a per-source minimum size before any reader swap.
pub fn check_min_size(archive: &Path, min: u64) -> Result<(), UpdateError> {
    let size = std::fs::metadata(archive)?.len();
    if size < min {
        return Err(UpdateError::TooSmall {
            path: archive.to_path_buf(),
            size,
            min,
        });
    }
    Ok(())
}

/// Extracts the database member of `archive`, whatever its format, to `dest`.
pub fn unpack_database(archive: &Path, dest: &Path) -> Result<(), UpdateError> {
    match unpack_tar_gz(archive, dest) {
        Ok(()) => Ok(()),
        Err(err @ UpdateError::UnsupportedEntry(_)) => Err(err),
        Err(_) => unpack_zip(archive, dest),
    }
}

/// Extracts the first tar.gz member whose name contains `mmdb` or `BIN`.
pub fn unpack_tar_gz(archive: &Path, dest: &Path) -> Result<(), UpdateError> {
    let file = File::open(archive)?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    for entry in tar.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().into_owned();
        match entry.header().entry_type() {
            EntryType::Directory => continue,
            EntryType::Regular => {
                if is_database_member(&name) {
                    let mut out = File::create(dest)?;
                    io::copy(&mut entry, &mut out)?;
                    return Ok(());
                }
            }
            _ => return Err(UpdateError::UnsupportedEntry(name)),
        }
    }
    Err(UpdateError::MissingMember(archive.to_path_buf()))
}

/// Extracts the first zip member whose name contains `mmdb` or `BIN`.
pub fn unpack_zip(archive: &Path, dest: &Path) -> Result<(), UpdateError> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() || !is_database_member(entry.name()) {
            continue;
        }
        let mut out = File::create(dest)?;
        io::copy(&mut entry, &mut out)?;
        return Ok(());
    }
    Err(UpdateError::MissingMember(archive.to_path_buf()))
}

/// Expands every CSV member of a zip archive into a sibling directory named
/// after the archive's stem and returns that directory.
pub fn unpack_zip_all(archive: &Path) -> Result<PathBuf, UpdateError> {
    let dest = archive.with_extension("");
    std::fs::create_dir_all(&dest)?;

    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() || !entry.name().to_lowercase().contains(".csv") {
            continue;
        }
        // Member paths may carry directory prefixes; flatten to the base name.
        let base = Path::new(entry.name())
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if base.is_empty() {
            continue;
        }
        let mut out = File::create(dest.join(base))?;
        io::copy(&mut entry, &mut out)?;
    }
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use zip::write::FileOptions;

    use super::*;

    fn write_tar_gz(path: &Path, members: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let gz = GzEncoder::new(file, Compression::default());
        let mut tar = tar::Builder::new(gz);
        for (name, data) in members {
            let mut header = tar::Header::new_gnu();
            header.set_size(u64::try_from(data.len()).unwrap());
            header.set_mode(0o644);
            header.set_cksum();
            tar.append_data(&mut header, name, *data).unwrap();
        }
        tar.into_inner().unwrap().finish().unwrap();
    }

    fn write_zip(path: &Path, members: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, data) in members {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn tar_gz_extracts_first_database_member() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("city.tar.gz");
        write_tar_gz(
            &archive,
            &[
                ("GeoLite2-City_20230101/README.txt", b"hi".as_slice()),
                ("GeoLite2-City_20230101/GeoLite2-City.mmdb", b"mmdb-bytes"),
            ],
        );
        let dest = dir.path().join("city.mmdb");
        unpack_tar_gz(&archive, &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"mmdb-bytes");
    }

    #[test]
    fn tar_gz_without_database_member_errors() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("city.tar.gz");
        write_tar_gz(&archive, &[("README.txt", b"hi".as_slice())]);
        let err = unpack_tar_gz(&archive, &dir.path().join("city.mmdb")).unwrap_err();
        assert!(matches!(err, UpdateError::MissingMember(_)));
    }

    #[test]
    fn zip_extracts_bin_member() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("px.zip");
        write_zip(
            &archive,
            &[
                ("LICENSE.TXT", b"license".as_slice()),
                ("PX8.BIN", b"bin-bytes"),
            ],
        );
        let dest = dir.path().join("px.bin");
        unpack_zip(&archive, &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"bin-bytes");
    }

    #[test]
    fn unpack_database_falls_back_to_zip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("px.zip");
        write_zip(&archive, &[("PX8.BIN", b"bin-bytes".as_slice())]);
        let dest = dir.path().join("px.bin");
        unpack_database(&archive, &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"bin-bytes");
    }

    #[test]
    fn zip_all_expands_only_csv_members() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("blocks.zip");
        write_zip(
            &archive,
            &[
                ("inner/Blocks-IPv4.csv", b"a,b".as_slice()),
                ("inner/Blocks-IPv6.csv", b"c,d"),
                ("inner/COPYRIGHT.txt", b"no"),
            ],
        );
        let dest = unpack_zip_all(&archive).unwrap();
        assert_eq!(dest, dir.path().join("blocks"));
        assert!(dest.join("Blocks-IPv4.csv").exists());
        assert!(dest.join("Blocks-IPv6.csv").exists());
        assert!(!dest.join("COPYRIGHT.txt").exists());
    }

    #[test]
    fn min_size_gate() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("px.zip");
        std::fs::write(&archive, vec![0u8; 100]).unwrap();
        assert!(matches!(
            check_min_size(&archive, 1200),
            Err(UpdateError::TooSmall { .. })
        ));
        assert!(check_min_size(&archive, 50).is_ok());
    }
}
