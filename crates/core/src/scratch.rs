//! Scoped scratch files
//!
//! Intermediate clips and concat manifests live in the working directory under
//! a per-run prefix. A [`ScratchFile`] removes its path when dropped, so every
//! exit from a step (success, `?`, panic unwinding) releases what it created.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

/// Namespace for the scratch files of one operation or recipe run
#[derive(Debug)]
pub struct ScratchSpace {
    dir: PathBuf,
    prefix: String,
}

impl ScratchSpace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: format!(".clipsmith-{}", Uuid::new_v4().simple()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a scratch path; nothing is created on disk until a step writes it
    pub fn file(&self, name: &str) -> ScratchFile {
        ScratchFile {
            path: self.dir.join(format!("{}-{}", self.prefix, name)),
            armed: true,
        }
    }
}

#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    armed: bool,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the artifact to `dest`, replacing whatever is there, and keep it
    pub async fn persist(mut self, dest: &Path) -> Result<PathBuf> {
        replace_file(&self.path, dest).await?;
        self.armed = false;
        Ok(dest.to_path_buf())
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed scratch file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "could not remove scratch file"),
        }
    }
}

/// Rename `src` over `dest`. A missing `dest` is fine and a failed move leaves
/// an existing `dest` untouched.
pub async fn replace_file(src: &Path, dest: &Path) -> Result<()> {
    match tokio::fs::rename(src, dest).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            debug!(src = %src.display(), dest = %dest.display(), "rename crosses filesystems, copying");
            move_by_copy(src, dest).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Copy `src` next to `dest`, rename it into place, then drop `src`
async fn move_by_copy(src: &Path, dest: &Path) -> Result<()> {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staged = dest.with_file_name(format!(".{name}.partial"));

    let copied = async {
        tokio::fs::copy(src, &staged).await?;
        tokio::fs::rename(&staged, dest).await
    };
    if let Err(e) = copied.await {
        let _ = tokio::fs::remove_file(&staged).await;
        return Err(e.into());
    }

    if let Err(e) = tokio::fs::remove_file(src).await {
        warn!(path = %src.display(), error = %e, "could not remove scratch file");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ClipError, transcoder::testing::dir_entries};
    use tempfile::tempdir;

    #[test]
    fn dropped_scratch_file_is_removed() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path());
        let file = scratch.file("fade_part.mp4");
        std::fs::write(file.path(), b"x").unwrap();
        assert!(file.path().exists());

        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn dropping_unwritten_scratch_file_is_quiet() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path());
        drop(scratch.file("never_written.mp4"));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn scratch_names_are_unique_per_space() {
        let dir = tempdir().unwrap();
        let a = ScratchSpace::new(dir.path()).file("part.mp4");
        let b = ScratchSpace::new(dir.path()).file("part.mp4");
        assert_ne!(a.path(), b.path());
        assert!(a.path().to_string_lossy().ends_with("-part.mp4"));
        assert_eq!(a.path().parent(), Some(dir.path()));
    }

    #[test]
    fn scratch_file_removed_when_step_errors() {
        fn failing_step(scratch: &ScratchSpace) -> Result<()> {
            let file = scratch.file("temp_with_silence.mp4");
            std::fs::write(file.path(), b"x")?;
            Err(std::io::Error::other("disk full").into())
        }

        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path());
        assert!(failing_step(&scratch).is_err());
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn undeletable_scratch_path_does_not_fail_the_step() {
        fn step(scratch: &ScratchSpace) -> Result<()> {
            let file = scratch.file("fade_part.mp4");
            std::fs::create_dir(file.path())?;
            std::fs::write(file.path().join("frame"), b"x")?;
            Ok(())
        }

        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path());
        assert!(step(&scratch).is_ok());
        assert_eq!(dir_entries(dir.path()).len(), 1);
    }

    #[tokio::test]
    async fn failed_replace_keeps_existing_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("Long.mp4");
        std::fs::write(&dest, b"old").unwrap();

        let err = replace_file(&dir.path().join("missing.mp4"), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, ClipError::IoError(ref e) if e.kind() == ErrorKind::NotFound));
        assert_eq!(std::fs::read(&dest).unwrap(), b"old");
    }

    #[tokio::test]
    async fn copy_fallback_replaces_destination_and_drops_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("scratch.mp4");
        let dest = dir.path().join("Short.mp4");
        std::fs::write(&src, b"new").unwrap();
        std::fs::write(&dest, b"old").unwrap();

        move_by_copy(&src, &dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
        assert_eq!(dir_entries(dir.path()), vec!["Short.mp4"]);
    }

    #[tokio::test]
    async fn failed_copy_fallback_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("Short.mp4");
        std::fs::write(&dest, b"old").unwrap();

        assert!(
            move_by_copy(&dir.path().join("missing.mp4"), &dest)
                .await
                .is_err()
        );
        assert_eq!(std::fs::read(&dest).unwrap(), b"old");
        assert_eq!(dir_entries(dir.path()), vec!["Short.mp4"]);
    }

    #[tokio::test]
    async fn persist_moves_file_and_disarms_cleanup() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path());
        let file = scratch.file("with_music.mp4");
        std::fs::write(file.path(), b"final").unwrap();

        let dest = dir.path().join("Long.mp4");
        let kept = file.persist(&dest).await.unwrap();
        assert_eq!(kept, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"final");
        assert_eq!(dir_entries(dir.path()), vec!["Long.mp4"]);
    }

    #[tokio::test]
    async fn persist_replaces_existing_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("Short.mp4");
        std::fs::write(&dest, b"old").unwrap();

        let scratch = ScratchSpace::new(dir.path());
        let file = scratch.file("iphone_ready.mp4");
        std::fs::write(file.path(), b"new").unwrap();
        file.persist(&dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
        assert_eq!(dir_entries(dir.path()), vec!["Short.mp4"]);
    }
}
