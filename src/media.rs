use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

lazy_static::lazy_static! {
    static ref SUPPORTED_EXTENSIONS: HashMap<&'static str, MediaKind> = {
        let mut map = HashMap::new();
        // Image formats
        map.insert("jpg", MediaKind::Image);
        map.insert("jpeg", MediaKind::Image);
        map.insert("png", MediaKind::Image);
        map.insert("gif", MediaKind::Image);

        // Video formats
        map.insert("mp4", MediaKind::Video);
        map.insert("m4v", MediaKind::Video);
        map.insert("mov", MediaKind::Video);
        map.insert("avi", MediaKind::Video);

        map
    };
}

/// Names starting with this are never touched.
pub const HIDDEN_PREFIX: char = '.';

pub fn media_kind(filename: &str) -> Option<MediaKind> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| SUPPORTED_EXTENSIONS.get(ext.to_lowercase().as_str()).copied())
}

/// One file whose modification time may be rewritten.
#[derive(Debug, Clone)]
pub struct MediaItem {
    pub name: String,
    pub dir: PathBuf,
    pub kind: MediaKind,
    /// Filled in by the reconciler on first use.
    pub current: Option<String>,
    pub target: Option<String>,
}

impl MediaItem {
    pub fn new(dir: &Path, name: &str) -> Option<Self> {
        if name.starts_with(HIDDEN_PREFIX) {
            return None;
        }
        let kind = media_kind(name)?;
        Some(MediaItem {
            name: name.to_string(),
            dir: dir.to_path_buf(),
            kind,
            current: None,
            target: None,
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    /// File name without its extension, the input of the file name parser.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.name)
    }
}

/// Supported media files directly inside `dir`, sorted by name.
pub fn list_media(dir: &Path) -> Result<Vec<MediaItem>, walkdir::Error> {
    let mut items = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) => {
                if let Some(item) = MediaItem::new(dir, name) {
                    items.push(item);
                }
            }
            None => log::warn!("skipping non UTF-8 file name {}", entry.path().display()),
        }
    }

    Ok(items)
}
