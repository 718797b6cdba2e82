use std::{
    fs::{self, File},
    io::{self, Read},
    path::Path,
};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tar::Archive;
use zip::read::ZipArchive;

use crate::error::{HubError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    TarBz2,
}

impl ArchiveFormat {
    /// Identifies the container from its leading bytes.
    #[must_use]
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
            Some(Self::Zip)
        } else if header.starts_with(&[0x1f, 0x8b]) {
            Some(Self::TarGz)
        } else if header.starts_with(b"BZh") {
            Some(Self::TarBz2)
        } else {
            None
        }
    }

    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarBz2 => "tar.bz2",
        }
    }
}

/// Unpacks every entry of `archive_path` into `target_dir`.
///
/// The archive itself is left in place; deleting it is up to the caller.
pub fn extract_archive(archive_path: &Path, target_dir: &Path) -> Result<ArchiveFormat> {
    let mut file = File::open(archive_path).map_err(|err| HubError::corrupt(archive_path, err))?;
    let mut header = [0u8; 4];
    let read = read_header(&mut file, &mut header).map_err(|err| HubError::corrupt(archive_path, err))?;
    let format = ArchiveFormat::sniff(&header[..read])
        .ok_or_else(|| HubError::corrupt(archive_path, "unrecognized archive format"))?;
    let file = File::open(archive_path).map_err(|err| HubError::corrupt(archive_path, err))?;

    fs::create_dir_all(target_dir).map_err(|err| HubError::corrupt(archive_path, err))?;
    tracing::debug!(format = format.extension(), "extracting archive");

    match format {
        ArchiveFormat::Zip => extract_zip(archive_path, file, target_dir)?,
        ArchiveFormat::TarGz => extract_tar(archive_path, GzDecoder::new(file), target_dir)?,
        ArchiveFormat::TarBz2 => extract_tar(archive_path, BzDecoder::new(file), target_dir)?,
    }
    Ok(format)
}

fn read_header(file: &mut File, header: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < header.len() {
        let read = file.read(&mut header[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

fn extract_zip(archive_path: &Path, file: File, target_dir: &Path) -> Result<()> {
    let corrupt = |err: &dyn std::fmt::Display| HubError::corrupt(archive_path, err);
    let mut archive = ZipArchive::new(file).map_err(|err| corrupt(&err))?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|err| corrupt(&err))?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            return Err(corrupt(&format!("entry {:?} escapes the target directory", entry.name())));
        };
        let dest = target_dir.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&dest).map_err(|err| corrupt(&err))?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|err| corrupt(&err))?;
            }
            let mut outfile = File::create(&dest).map_err(|err| corrupt(&err))?;
            io::copy(&mut entry, &mut outfile).map_err(|err| corrupt(&err))?;
        }
    }
    Ok(())
}

fn extract_tar<R: Read>(archive_path: &Path, reader: R, target_dir: &Path) -> Result<()> {
    let mut archive = Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|err| HubError::corrupt(archive_path, err))?;
    for entry in entries {
        let mut entry = entry.map_err(|err| HubError::corrupt(archive_path, err))?;
        let unpacked = entry
            .unpack_in(target_dir)
            .map_err(|err| HubError::corrupt(archive_path, err))?;
        if !unpacked {
            let path = entry
                .path()
                .map(|path| path.display().to_string())
                .unwrap_or_default();
            return Err(HubError::corrupt(
                archive_path,
                format!("entry {path:?} escapes the target directory"),
            ));
        }
    }
    Ok(())
}
