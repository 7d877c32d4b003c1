//! Path router: decides where a downloaded file ends up
//!
//! Rules are evaluated top to bottom, the first match wins:
//!
//! 1. explicit folder override
//! 2. `.mp3` / `.flac` → `mp3/`
//! 3. `.pdf` / `.cbr` → `pdf/`
//! 4. `.jpg` → `jpg/`
//! 5. `.torrent` → torrent watch root
//! 6. anything else → `completed/`
//!
//! Extensions are compared case-insensitively.

use std::io;
use std::path::{Path, PathBuf};

use crate::core::utils::escape_filename;

pub const TMP_DIR: &str = "tmp";
pub const COMPLETED_DIR: &str = "completed";
pub const AUDIO_DIR: &str = "mp3";
pub const DOCUMENTS_DIR: &str = "pdf";
pub const IMAGES_DIR: &str = "jpg";
pub const OUTBOX_DIR: &str = "sendFiles";

/// Directory tree the bot writes into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
    torrents: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>, torrents: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            torrents: torrents.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Staging area for in-progress downloads
    pub fn tmp(&self) -> PathBuf {
        self.root.join(TMP_DIR)
    }

    pub fn completed(&self) -> PathBuf {
        self.root.join(COMPLETED_DIR)
    }

    pub fn audio(&self) -> PathBuf {
        self.root.join(AUDIO_DIR)
    }

    pub fn documents(&self) -> PathBuf {
        self.root.join(DOCUMENTS_DIR)
    }

    pub fn images(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    pub fn outbox(&self) -> PathBuf {
        self.root.join(OUTBOX_DIR)
    }

    pub fn torrents(&self) -> &Path {
        &self.torrents
    }

    /// Named sub-folder of `completed/` used by folder directives
    pub fn folder(&self, name: &str) -> PathBuf {
        self.completed().join(escape_filename(name))
    }

    /// First-run creation of the fixed directories. Idempotent.
    ///
    /// `jpg/` is left out; the router creates it on demand.
    pub fn init(&self) -> io::Result<()> {
        for dir in [
            self.tmp(),
            self.completed(),
            self.audio(),
            self.documents(),
            self.outbox(),
            self.torrents.clone(),
        ] {
            std::fs::create_dir_all(&dir)?;
            log::debug!("Ensured directory {}", dir.display());
        }
        Ok(())
    }
}

/// Rule that selected a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingRule {
    FolderOverride,
    Audio,
    Documents,
    Images,
    Torrents,
    Completed,
}

impl RoutingRule {
    /// Evaluates the rules for a file name and an optional override
    pub fn select(filename: &str, folder_override: Option<&Path>) -> Self {
        if effective_override(folder_override).is_some() {
            return RoutingRule::FolderOverride;
        }

        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("mp3" | "flac") => RoutingRule::Audio,
            Some("pdf" | "cbr") => RoutingRule::Documents,
            Some("jpg") => RoutingRule::Images,
            Some("torrent") => RoutingRule::Torrents,
            _ => RoutingRule::Completed,
        }
    }
}

fn effective_override(folder_override: Option<&Path>) -> Option<&Path> {
    folder_override.filter(|dir| !dir.as_os_str().is_empty())
}

/// Maps file names to destination directories of a [`Layout`]
#[derive(Debug, Clone)]
pub struct PathRouter {
    layout: Layout,
}

impl PathRouter {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Destination directory for `filename`, without touching the filesystem
    pub fn destination_for(&self, filename: &str, folder_override: Option<&Path>) -> PathBuf {
        match RoutingRule::select(filename, folder_override) {
            RoutingRule::FolderOverride => match effective_override(folder_override) {
                Some(dir) => dir.to_path_buf(),
                None => self.layout.completed(),
            },
            RoutingRule::Audio => self.layout.audio(),
            RoutingRule::Documents => self.layout.documents(),
            RoutingRule::Images => self.layout.images(),
            RoutingRule::Torrents => self.layout.torrents().to_path_buf(),
            RoutingRule::Completed => self.layout.completed(),
        }
    }

    /// Destination directory for `filename`, created if absent.
    ///
    /// `completed/` itself is never created here; it belongs to [`Layout::init`].
    /// A missing `completed/` therefore surfaces when the file is moved.
    pub fn route(&self, filename: &str, folder_override: Option<&Path>) -> io::Result<PathBuf> {
        let rule = RoutingRule::select(filename, folder_override);
        let destination = self.destination_for(filename, folder_override);

        if rule != RoutingRule::Completed {
            std::fs::create_dir_all(&destination)?;
        }

        log::debug!("Routed {} via {:?} to {}", filename, rule, destination.display());
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn router(temp: &TempDir) -> PathRouter {
        let layout = Layout::new(temp.path().join("download"), temp.path().join("watch"));
        PathRouter::new(layout)
    }

    #[test]
    fn test_extension_rules() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);
        let root = temp.path().join("download");

        for name in ["song.mp3", "song.flac", "SONG.MP3"] {
            assert_eq!(router.destination_for(name, None), root.join("mp3"));
        }
        for name in ["report.pdf", "comic.cbr"] {
            assert_eq!(router.destination_for(name, None), root.join("pdf"));
        }
        assert_eq!(router.destination_for("photo.jpg", None), root.join("jpg"));
        assert_eq!(router.destination_for("linux.torrent", None), temp.path().join("watch"));
    }

    #[test]
    fn test_default_rule_is_total() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);
        let completed = temp.path().join("download").join("completed");

        for name in ["movie.mkv", "archive.tar.gz", "noextension", "", ".mp3", "photo.jpeg"] {
            assert_eq!(router.destination_for(name, None), completed, "name {:?}", name);
        }
    }

    #[test]
    fn test_override_beats_extension() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);
        let custom = temp.path().join("custom");

        for name in ["a.mp3", "b.pdf", "c.jpg", "d.torrent", "e.bin"] {
            assert_eq!(router.destination_for(name, Some(&custom)), custom);
        }
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);
        assert_eq!(
            router.destination_for("a.pdf", Some(Path::new(""))),
            temp.path().join("download").join("pdf")
        );
    }

    #[test]
    fn test_route_creates_override_and_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);
        let album = temp.path().join("download").join("completed").join("MyAlbum");

        let first = router.route("album.mp3", Some(&album)).unwrap();
        let second = router.route("album.mp3", Some(&album)).unwrap();

        assert_eq!(first, album);
        assert_eq!(first, second);
        assert!(album.is_dir());
    }

    #[test]
    fn test_route_creates_images_dir_on_demand() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);
        router.layout().init().unwrap();
        assert!(!router.layout().images().exists());

        let dir = router.route("x.jpg", None).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_route_never_creates_completed() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);

        let dir = router.route("movie.mkv", None).unwrap();
        assert_eq!(dir, temp.path().join("download").join("completed"));
        assert!(!dir.exists());
    }

    #[test]
    fn test_layout_init() {
        let temp = TempDir::new().unwrap();
        let layout = Layout::new(temp.path().join("download"), temp.path().join("watch"));

        layout.init().unwrap();
        layout.init().unwrap();

        for dir in [
            layout.tmp(),
            layout.completed(),
            layout.audio(),
            layout.documents(),
            layout.outbox(),
        ] {
            assert!(dir.is_dir(), "{} missing", dir.display());
        }
        assert!(layout.torrents().is_dir());
    }

    #[test]
    fn test_folder_name_is_escaped() {
        let layout = Layout::new("/download", "/watch");
        assert_eq!(layout.folder("My/Album"), PathBuf::from("/download/completed/My_Album"));
        assert_eq!(layout.folder(".."), PathBuf::from("/download/completed/unnamed"));
    }
}
