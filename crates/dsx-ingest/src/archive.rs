//! ZIP extraction for image datasets.

use dsx_core::models::ArchiveEntry;
use dsx_core::IngestConfig;
use dsx_storage::keys::base_filename;
use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::IngestError;

const SUPPORTED_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

/// Whether an archive path names a supported image, by case-insensitive extension.
pub fn is_supported_image(path: &str) -> bool {
    let lower = path.to_lowercase();
    SUPPORTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// MIME type sent to storage for an image filename. Unknown extensions fall back
/// to JPEG.
pub fn content_type_for(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// Decompression bounds applied while unpacking an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionLimits {
    pub max_entry_bytes: u64,
    pub max_total_bytes: u64,
}

impl From<&IngestConfig> for ExtractionLimits {
    fn from(config: &IngestConfig) -> Self {
        Self {
            max_entry_bytes: config.max_image_bytes,
            max_total_bytes: config.max_extracted_bytes,
        }
    }
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self::from(&IngestConfig::default())
    }
}

/// Unpack every supported image from a ZIP archive held in memory.
///
/// Directories and entries with other extensions are skipped. Entry names are
/// reduced to their base filename, so `shots/day1/a.png` becomes `a.png`. Entries
/// come back in archive order.
///
/// The whole archive is rejected if it cannot be parsed, any selected entry
/// cannot be read, or the decompressed images exceed `limits`; no partial list is
/// returned. Sizes declared in the archive are not trusted: reads stop one byte
/// past the remaining allowance.
pub fn extract_images(
    archive: &[u8],
    limits: &ExtractionLimits,
) -> Result<Vec<ArchiveEntry>, IngestError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))
        .map_err(|e| IngestError::Extraction(e.to_string()))?;

    let mut entries = Vec::new();
    let mut extracted: u64 = 0;
    for index in 0..zip.len() {
        let file = zip
            .by_index(index)
            .map_err(|e| IngestError::Extraction(format!("entry {}: {}", index, e)))?;

        if file.is_dir() || !is_supported_image(file.name()) {
            continue;
        }
        // Ends in an image extension, so never empty.
        let name = base_filename(file.name()).to_string();

        let allowance = limits
            .max_entry_bytes
            .min(limits.max_total_bytes.saturating_sub(extracted));
        if file.size() > allowance {
            return Err(size_exceeded(&name, file.size(), limits));
        }

        let mut bytes = Vec::new();
        file.take(allowance.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|e| IngestError::Extraction(format!("{}: {}", name, e)))?;

        let read = bytes.len() as u64;
        if read > allowance {
            return Err(size_exceeded(&name, read, limits));
        }
        extracted += read;

        entries.push(ArchiveEntry::new(name, bytes));
    }

    tracing::debug!(
        archive_entries = zip.len(),
        image_entries = entries.len(),
        extracted_bytes = extracted,
        "Extracted images from archive"
    );

    Ok(entries)
}

fn size_exceeded(name: &str, size: u64, limits: &ExtractionLimits) -> IngestError {
    IngestError::Extraction(format!(
        "{} decompresses to at least {} bytes; limits are {} bytes per image and {} bytes per archive",
        name, size, limits.max_entry_bytes, limits.max_total_bytes
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};
    use zip::CompressionMethod;

    fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
            for (name, data) in files {
                if name.ends_with('/') {
                    zip.add_directory(*name, options).unwrap();
                } else {
                    zip.start_file(*name, options).unwrap();
                    zip.write_all(data).unwrap();
                }
            }
            zip.finish().unwrap();
        }
        buffer
    }

    #[test]
    fn test_extract_filters_to_supported_images() {
        let archive = build_zip(&[
            ("a.txt", b"notes"),
            ("b.JPG", b"jpeg"),
            ("dir/", b""),
            ("c.png", b"png"),
        ]);

        let entries = extract_images(&archive, &ExtractionLimits::default()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b.JPG", "c.png"]);
        assert_eq!(entries[0].bytes, b"jpeg".to_vec());
    }

    #[test]
    fn test_extract_strips_directories_from_names() {
        let archive = build_zip(&[("shots/day1/a.webp", b"webp"), ("shots/b.jpeg", b"jpg")]);

        let entries = extract_images(&archive, &ExtractionLimits::default()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.webp", "b.jpeg"]);
    }

    #[test]
    fn test_extract_empty_archive() {
        let archive = build_zip(&[("readme.md", b"# dataset")]);
        assert!(extract_images(&archive, &ExtractionLimits::default()).unwrap().is_empty());
    }

    #[test]
    fn test_extract_rejects_corrupt_archive() {
        let result = extract_images(b"definitely not a zip file", &ExtractionLimits::default());
        assert!(matches!(result, Err(IngestError::Extraction(_))));
    }

    fn crc32(data: &[u8]) -> u32 {
        let mut crc = !0u32;
        for byte in data {
            crc ^= u32::from(*byte);
            for _ in 0..8 {
                crc = if crc & 1 == 1 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
            }
        }
        !crc
    }

    /// Single stored entry whose central directory claims (through a zip64 extra
    /// field) an uncompressed size of `declared` bytes.
    fn zip_with_declared_size(name: &str, data: &[u8], declared: u64) -> Vec<u8> {
        let crc = crc32(data);
        let len = data.len() as u32;
        let name_len = name.len() as u16;
        let mut out = Vec::new();

        // Local file header
        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&0u16.to_le_bytes()); // stored
        out.extend_from_slice(&0u16.to_le_bytes()); // time
        out.extend_from_slice(&0x21u16.to_le_bytes()); // date
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&name_len.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra length
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(data);

        let central_start = out.len() as u32;
        out.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        out.extend_from_slice(&45u16.to_le_bytes()); // version made by
        out.extend_from_slice(&45u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&0u16.to_le_bytes()); // stored
        out.extend_from_slice(&0u16.to_le_bytes()); // time
        out.extend_from_slice(&0x21u16.to_le_bytes()); // date
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&u32::MAX.to_le_bytes()); // size lives in zip64 extra
        out.extend_from_slice(&name_len.to_le_bytes());
        out.extend_from_slice(&12u16.to_le_bytes()); // extra length
        out.extend_from_slice(&0u16.to_le_bytes()); // comment length
        out.extend_from_slice(&0u16.to_le_bytes()); // disk start
        out.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
        out.extend_from_slice(&0u32.to_le_bytes()); // external attributes
        out.extend_from_slice(&0u32.to_le_bytes()); // local header offset
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&0x0001u16.to_le_bytes()); // zip64 extra id
        out.extend_from_slice(&8u16.to_le_bytes());
        out.extend_from_slice(&declared.to_le_bytes());
        let central_size = out.len() as u32 - central_start;

        // End of central directory
        out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&central_size.to_le_bytes());
        out.extend_from_slice(&central_start.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    #[test]
    fn test_extract_rejects_entry_declaring_huge_size() {
        let archive = zip_with_declared_size("a.jpg", b"jpeg", 1 << 62);

        let result = extract_images(&archive, &ExtractionLimits::default());
        match result {
            Err(IngestError::Extraction(msg)) => assert!(msg.contains("a.jpg")),
            other => panic!("expected extraction error, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_rejects_entry_over_image_limit() {
        let archive = build_zip(&[("small.png", b"ok"), ("big.png", &[7u8; 64])]);
        let limits = ExtractionLimits {
            max_entry_bytes: 32,
            max_total_bytes: 1024,
        };

        let result = extract_images(&archive, &limits);
        match result {
            Err(IngestError::Extraction(msg)) => assert!(msg.contains("big.png")),
            other => panic!("expected extraction error, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_rejects_archive_over_total_limit() {
        let archive = build_zip(&[
            ("a.png", &[1u8; 20]),
            ("b.png", &[2u8; 20]),
            ("c.png", &[3u8; 20]),
        ]);
        let limits = ExtractionLimits {
            max_entry_bytes: 32,
            max_total_bytes: 50,
        };

        assert!(matches!(
            extract_images(&archive, &limits),
            Err(IngestError::Extraction(_))
        ));

        let roomy = ExtractionLimits {
            max_entry_bytes: 32,
            max_total_bytes: 60,
        };
        assert_eq!(extract_images(&archive, &roomy).unwrap().len(), 3);
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.PNG"), "image/png");
        assert_eq!(content_type_for("b.webp"), "image/webp");
        assert_eq!(content_type_for("c.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("d.jpg"), "image/jpeg");
    }
}
