//! Chime sound files and the URIs speakers play them from.
//!
//! Sounds live in two folders under one root, shared to the speakers over
//! SMB:
//!
//! ```text
//! <root>/defaults/<index>-<name>.<ext>   bundled sounds
//! <root>/uploads/<index>-<name>.<ext>    operator uploads
//! ```
//!
//! A speaker reaches a file as `x-file-cifs://<host-ip>/<share>/<folder>/<file>`.

use std::io;
use std::path::{Path, PathBuf};

use crate::context::NetworkContext;
use crate::protocol_constants::{DEFAULTS_FOLDER, UPLOADS_FOLDER};

/// Resolves a sound slot to a URI a speaker can play.
pub trait SoundLookup: Send + Sync {
    /// Returns `None` when no file exists for `sound_index`.
    ///
    /// With `prefer_default` set only the bundled sounds are searched;
    /// otherwise uploads are searched first.
    fn lookup(&self, sound_index: u8, prefer_default: bool) -> Option<String>;
}

/// [`SoundLookup`] over the sounds directory on disk.
#[derive(Debug, Clone)]
pub struct SoundLibrary {
    root: PathBuf,
    share_name: String,
    network: NetworkContext,
}

impl SoundLibrary {
    pub fn new(
        root: impl Into<PathBuf>,
        share_name: impl Into<String>,
        network: NetworkContext,
    ) -> Self {
        Self {
            root: root.into(),
            share_name: share_name.into(),
            network,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root, `defaults/` and `uploads/` folders if missing.
    pub fn ensure_layout(&self) -> io::Result<()> {
        for folder in [DEFAULTS_FOLDER, UPLOADS_FOLDER] {
            std::fs::create_dir_all(self.root.join(folder))?;
        }
        Ok(())
    }

    /// First file in `folder` named `<index>-*`, by name.
    fn find_in(&self, folder: &str, sound_index: u8) -> Option<String> {
        let prefix = format!("{sound_index}-");
        let entries = match std::fs::read_dir(self.root.join(folder)) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!(
                    "[Sounds] Cannot read {}/{}: {}",
                    self.root.display(),
                    folder,
                    e
                );
                return None;
            }
        };

        let mut matches: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(&prefix))
            .collect();
        matches.sort();
        matches.into_iter().next()
    }

    fn share_uri(&self, folder: &str, file_name: &str) -> String {
        format!(
            "x-file-cifs://{}/{}/{}/{}",
            self.network.get_local_ip(),
            self.share_name,
            folder,
            file_name
        )
    }
}

impl SoundLookup for SoundLibrary {
    fn lookup(&self, sound_index: u8, prefer_default: bool) -> Option<String> {
        let folders: &[&str] = if prefer_default {
            &[DEFAULTS_FOLDER]
        } else {
            &[UPLOADS_FOLDER, DEFAULTS_FOLDER]
        };

        folders.iter().find_map(|folder| {
            self.find_in(folder, sound_index)
                .map(|file| self.share_uri(folder, &file))
        })
    }
}
