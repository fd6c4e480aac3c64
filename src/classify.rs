//! File classification
//!
//! Pure lookups from MIME type or object key to a category tag, and from
//! byte size to a fixed size bucket. Every input maps to exactly one value.

use serde::Serialize;

/// Coarse content category used in type distributions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FileCategory {
    Image,
    Video,
    Audio,
    Document,
    Spreadsheet,
    Presentation,
    Archive,
    Code,
    Other,
}

impl FileCategory {
    /// All categories in display order
    pub const ALL: [FileCategory; 9] = [
        FileCategory::Image,
        FileCategory::Video,
        FileCategory::Audio,
        FileCategory::Document,
        FileCategory::Spreadsheet,
        FileCategory::Presentation,
        FileCategory::Archive,
        FileCategory::Code,
        FileCategory::Other,
    ];

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            FileCategory::Image => "Images",
            FileCategory::Video => "Videos",
            FileCategory::Audio => "Audio",
            FileCategory::Document => "Documents",
            FileCategory::Spreadsheet => "Spreadsheets",
            FileCategory::Presentation => "Presentations",
            FileCategory::Archive => "Archives",
            FileCategory::Code => "Code",
            FileCategory::Other => "Other",
        }
    }
}

/// Exact MIME types that are not covered by a top-level prefix
const MIME_TABLE: &[(&str, FileCategory)] = &[
    ("application/pdf", FileCategory::Document),
    ("application/msword", FileCategory::Document),
    ("application/rtf", FileCategory::Document),
    ("application/vnd.openxmlformats-officedocument.wordprocessingml.document", FileCategory::Document),
    ("application/vnd.oasis.opendocument.text", FileCategory::Document),
    ("application/vnd.ms-excel", FileCategory::Spreadsheet),
    ("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", FileCategory::Spreadsheet),
    ("application/vnd.oasis.opendocument.spreadsheet", FileCategory::Spreadsheet),
    ("text/csv", FileCategory::Spreadsheet),
    ("application/vnd.ms-powerpoint", FileCategory::Presentation),
    ("application/vnd.openxmlformats-officedocument.presentationml.presentation", FileCategory::Presentation),
    ("application/vnd.oasis.opendocument.presentation", FileCategory::Presentation),
    ("application/zip", FileCategory::Archive),
    ("application/gzip", FileCategory::Archive),
    ("application/x-tar", FileCategory::Archive),
    ("application/x-7z-compressed", FileCategory::Archive),
    ("application/x-rar-compressed", FileCategory::Archive),
    ("application/vnd.rar", FileCategory::Archive),
    ("application/x-bzip2", FileCategory::Archive),
    ("application/json", FileCategory::Code),
    ("application/javascript", FileCategory::Code),
    ("application/xml", FileCategory::Code),
    ("application/x-sh", FileCategory::Code),
    ("application/x-python", FileCategory::Code),
    ("text/html", FileCategory::Code),
    ("text/css", FileCategory::Code),
    ("text/javascript", FileCategory::Code),
    ("text/x-python", FileCategory::Code),
    ("text/x-rust", FileCategory::Code),
    ("text/plain", FileCategory::Document),
    ("text/markdown", FileCategory::Document),
];

/// Lowercase file extensions
const EXTENSION_TABLE: &[(&str, FileCategory)] = &[
    ("jpg", FileCategory::Image),
    ("jpeg", FileCategory::Image),
    ("png", FileCategory::Image),
    ("gif", FileCategory::Image),
    ("webp", FileCategory::Image),
    ("bmp", FileCategory::Image),
    ("svg", FileCategory::Image),
    ("heic", FileCategory::Image),
    ("tiff", FileCategory::Image),
    ("ico", FileCategory::Image),
    ("mp4", FileCategory::Video),
    ("mov", FileCategory::Video),
    ("avi", FileCategory::Video),
    ("mkv", FileCategory::Video),
    ("webm", FileCategory::Video),
    ("wmv", FileCategory::Video),
    ("m4v", FileCategory::Video),
    ("mp3", FileCategory::Audio),
    ("wav", FileCategory::Audio),
    ("flac", FileCategory::Audio),
    ("aac", FileCategory::Audio),
    ("ogg", FileCategory::Audio),
    ("m4a", FileCategory::Audio),
    ("pdf", FileCategory::Document),
    ("doc", FileCategory::Document),
    ("docx", FileCategory::Document),
    ("odt", FileCategory::Document),
    ("rtf", FileCategory::Document),
    ("txt", FileCategory::Document),
    ("md", FileCategory::Document),
    ("xls", FileCategory::Spreadsheet),
    ("xlsx", FileCategory::Spreadsheet),
    ("ods", FileCategory::Spreadsheet),
    ("csv", FileCategory::Spreadsheet),
    ("ppt", FileCategory::Presentation),
    ("pptx", FileCategory::Presentation),
    ("odp", FileCategory::Presentation),
    ("key", FileCategory::Presentation),
    ("zip", FileCategory::Archive),
    ("gz", FileCategory::Archive),
    ("tgz", FileCategory::Archive),
    ("tar", FileCategory::Archive),
    ("7z", FileCategory::Archive),
    ("rar", FileCategory::Archive),
    ("bz2", FileCategory::Archive),
    ("xz", FileCategory::Archive),
    ("rs", FileCategory::Code),
    ("js", FileCategory::Code),
    ("ts", FileCategory::Code),
    ("py", FileCategory::Code),
    ("go", FileCategory::Code),
    ("java", FileCategory::Code),
    ("c", FileCategory::Code),
    ("cpp", FileCategory::Code),
    ("h", FileCategory::Code),
    ("html", FileCategory::Code),
    ("css", FileCategory::Code),
    ("json", FileCategory::Code),
    ("xml", FileCategory::Code),
    ("yaml", FileCategory::Code),
    ("yml", FileCategory::Code),
    ("toml", FileCategory::Code),
    ("sh", FileCategory::Code),
];

/// Classify by stored MIME type (local records)
pub fn classify_mime(mime: &str) -> FileCategory {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if let Some((_, category)) = MIME_TABLE.iter().find(|(m, _)| *m == essence) {
        return *category;
    }

    match essence.split('/').next().unwrap_or_default() {
        "image" => FileCategory::Image,
        "video" => FileCategory::Video,
        "audio" => FileCategory::Audio,
        _ => FileCategory::Other,
    }
}

/// Classify by the extension of an object key (remote objects)
pub fn classify_key(key: &str) -> FileCategory {
    let name = key.rsplit('/').next().unwrap_or(key);
    let extension = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return FileCategory::Other,
    };

    EXTENSION_TABLE
        .iter()
        .find(|(e, _)| *e == extension)
        .map(|(_, category)| *category)
        .unwrap_or(FileCategory::Other)
}

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Fixed, non-overlapping size ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SizeBucket {
    /// [0, 10 KiB)
    Tiny,
    /// [10 KiB, 1 MiB)
    Small,
    /// [1 MiB, 100 MiB)
    Medium,
    /// [100 MiB, 1 GiB)
    Large,
    /// 1 GiB and above
    Huge,
}

impl SizeBucket {
    /// All buckets in ascending order
    pub const ALL: [SizeBucket; 5] = [
        SizeBucket::Tiny,
        SizeBucket::Small,
        SizeBucket::Medium,
        SizeBucket::Large,
        SizeBucket::Huge,
    ];

    /// Bucket for a byte size
    pub fn of(size: u64) -> Self {
        match size {
            s if s < 10 * KIB => SizeBucket::Tiny,
            s if s < MIB => SizeBucket::Small,
            s if s < 100 * MIB => SizeBucket::Medium,
            s if s < GIB => SizeBucket::Large,
            _ => SizeBucket::Huge,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SizeBucket::Tiny => "0-10KB",
            SizeBucket::Small => "10KB-1MB",
            SizeBucket::Medium => "1MB-100MB",
            SizeBucket::Large => "100MB-1GB",
            SizeBucket::Huge => ">1GB",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_mime() {
        assert_eq!(classify_mime("image/jpeg"), FileCategory::Image);
        assert_eq!(classify_mime("video/mp4"), FileCategory::Video);
        assert_eq!(classify_mime("audio/mpeg"), FileCategory::Audio);
        assert_eq!(classify_mime("application/pdf"), FileCategory::Document);
        assert_eq!(classify_mime("text/plain; charset=utf-8"), FileCategory::Document);
        assert_eq!(classify_mime("APPLICATION/ZIP"), FileCategory::Archive);
        assert_eq!(classify_mime("application/octet-stream"), FileCategory::Other);
        assert_eq!(classify_mime(""), FileCategory::Other);
    }

    #[test]
    fn test_classify_key() {
        assert_eq!(classify_key("photos/alice.JPG"), FileCategory::Image);
        assert_eq!(classify_key("backups/site.tar.gz"), FileCategory::Archive);
        assert_eq!(classify_key("src/main.rs"), FileCategory::Code);
        assert_eq!(classify_key("reports/q3.xlsx"), FileCategory::Spreadsheet);
        assert_eq!(classify_key("README"), FileCategory::Other);
        assert_eq!(classify_key("config/.env"), FileCategory::Other);
        assert_eq!(classify_key("weird.unknownext"), FileCategory::Other);
    }

    #[test]
    fn test_size_bucket_edges() {
        assert_eq!(SizeBucket::of(0), SizeBucket::Tiny);
        assert_eq!(SizeBucket::of(10 * KIB - 1), SizeBucket::Tiny);
        assert_eq!(SizeBucket::of(10 * KIB), SizeBucket::Small);
        assert_eq!(SizeBucket::of(MIB - 1), SizeBucket::Small);
        assert_eq!(SizeBucket::of(MIB), SizeBucket::Medium);
        assert_eq!(SizeBucket::of(100 * MIB), SizeBucket::Large);
        assert_eq!(SizeBucket::of(GIB - 1), SizeBucket::Large);
        assert_eq!(SizeBucket::of(GIB), SizeBucket::Huge);
        assert_eq!(SizeBucket::of(u64::MAX), SizeBucket::Huge);
    }

    #[test]
    fn test_every_bucket_has_label() {
        for bucket in SizeBucket::ALL {
            assert!(!bucket.label().is_empty());
        }
        for category in FileCategory::ALL {
            assert!(!category.label().is_empty());
        }
    }
}
