//! On-disk artifact layout and the staged commit protocol.
//!
//! An accident event's frame and clip are first written to
//! `staging/<event_id>/`. Once its record is stored they are renamed into
//! `videos/` and `images/` and the staging directory is removed. A staging
//! directory that survives a crash is resolved by
//! [`ArtifactStore::recover_staging`] at startup.

use std::path::{Path, PathBuf};

use roadwatch_core::naming::{
    clip_filename, frame_filename, is_safe_filename, IMAGES_DIR, STAGING_DIR, UPLOADS_DIR,
    VIDEOS_DIR,
};
use uuid::Uuid;

use crate::sink::RecordSink;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Artifacts of one event while they sit in staging.
#[derive(Debug)]
pub struct StagedEvent {
    pub event_id: Uuid,
    dir: PathBuf,
    /// File name of the staged clip, set once it has been written.
    pub clip: Option<String>,
    /// File name of the staged frame, set once it has been written.
    pub frame: Option<String>,
}

impl StagedEvent {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the clip encoder should write this event's clip.
    pub fn clip_path(&self) -> PathBuf {
        self.dir.join(clip_filename(self.event_id))
    }

    pub fn mark_clip_written(&mut self) {
        self.clip = Some(clip_filename(self.event_id));
    }
}

/// Outcome of a startup staging sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub published: Vec<Uuid>,
    pub discarded: Vec<Uuid>,
}

/// An upload written to disk for decoding. Removed when dropped.
#[derive(Debug)]
pub struct UploadedFile {
    path: PathBuf,
}

impl UploadedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UploadedFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove upload");
            }
        }
    }
}

/// The media root and its fixed subdirectories.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.root.join(VIDEOS_DIR)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    /// Create the media root and all subdirectories.
    pub async fn ensure_layout(&self) -> Result<(), ArtifactError> {
        for dir in [
            self.videos_dir(),
            self.images_dir(),
            self.staging_dir(),
            self.uploads_dir(),
        ] {
            tokio::fs::create_dir_all(&dir).await.map_err(io_err(&dir))?;
        }
        Ok(())
    }

    /// Create and remove a scratch file under the media root.
    pub async fn check_writable(&self) -> Result<(), ArtifactError> {
        let path = self.root.join(format!(".write-check-{}", Uuid::new_v4()));
        tokio::fs::write(&path, b"ok").await.map_err(io_err(&path))?;
        tokio::fs::remove_file(&path).await.map_err(io_err(&path))
    }

    /// Create the staging directory for a new event.
    pub async fn begin(&self, event_id: Uuid) -> Result<StagedEvent, ArtifactError> {
        let dir = self.staging_dir().join(event_id.to_string());
        tokio::fs::create_dir_all(&dir).await.map_err(io_err(&dir))?;
        Ok(StagedEvent {
            event_id,
            dir,
            clip: None,
            frame: None,
        })
    }

    /// Write the detection frame JPEG into staging.
    pub async fn stage_frame(&self, staged: &mut StagedEvent, jpeg: &[u8]) -> Result<(), ArtifactError> {
        let name = frame_filename(staged.event_id);
        let path = staged.dir.join(&name);
        tokio::fs::write(&path, jpeg).await.map_err(io_err(&path))?;
        staged.frame = Some(name);
        Ok(())
    }

    /// Move the artifacts written for `staged` to their final directories
    /// and drop its staging directory.
    pub async fn publish(&self, staged: &StagedEvent) -> Result<(), ArtifactError> {
        let mut targets = Vec::with_capacity(2);
        if let Some(clip) = &staged.clip {
            targets.push((clip.clone(), self.videos_dir()));
        }
        if let Some(frame) = &staged.frame {
            targets.push((frame.clone(), self.images_dir()));
        }
        self.publish_dir(&staged.dir, targets).await
    }

    /// Remove an event's staging directory and everything in it.
    pub async fn discard(&self, event_id: Uuid) -> Result<(), ArtifactError> {
        let dir = self.staging_dir().join(event_id.to_string());
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&dir)(e)),
        }
    }

    /// Resolve leftover staging directories.
    ///
    /// Events whose record exists are published; the rest are discarded, as
    /// are entries that are not event directories. An event whose record
    /// lookup fails is left in place for the next sweep.
    pub async fn recover_staging(
        &self,
        sink: &dyn RecordSink,
    ) -> Result<RecoveryReport, ArtifactError> {
        let staging = self.staging_dir();
        let mut report = RecoveryReport::default();

        let mut entries = match tokio::fs::read_dir(&staging).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(io_err(&staging)(e)),
        };

        while let Some(entry) = entries.next_entry().await.map_err(io_err(&staging))? {
            let path = entry.path();
            let Some(event_id) = entry
                .file_name()
                .to_str()
                .and_then(|name| Uuid::parse_str(name).ok())
            else {
                tracing::warn!(path = %path.display(), "Removing unrecognized staging entry");
                remove_any(&path).await?;
                continue;
            };

            match sink.contains(event_id).await {
                Ok(true) => {
                    let targets = vec![
                        (clip_filename(event_id), self.videos_dir()),
                        (frame_filename(event_id), self.images_dir()),
                    ];
                    self.publish_dir(&path, targets).await?;
                    tracing::info!(%event_id, "Published recovered accident artifacts");
                    report.published.push(event_id);
                }
                Ok(false) => {
                    remove_any(&path).await?;
                    tracing::info!(%event_id, "Discarded uncommitted accident artifacts");
                    report.discarded.push(event_id);
                }
                Err(e) => {
                    tracing::warn!(%event_id, error = %e, "Record lookup failed, leaving staging in place");
                }
            }
        }

        Ok(report)
    }

    /// Path of a published clip, if `filename` is safe and the file exists.
    pub async fn resolve_video(&self, filename: &str) -> Option<PathBuf> {
        resolve_in(&self.videos_dir(), filename).await
    }

    /// Path of a published frame, if `filename` is safe and the file exists.
    pub async fn resolve_image(&self, filename: &str) -> Option<PathBuf> {
        resolve_in(&self.images_dir(), filename).await
    }

    /// Persist an upload under a fresh name so it can be decoded from disk.
    pub async fn save_upload(
        &self,
        extension: Option<&str>,
        bytes: &[u8],
    ) -> Result<UploadedFile, ArtifactError> {
        let name = match extension {
            Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
            None => Uuid::new_v4().to_string(),
        };
        let dir = self.uploads_dir();
        tokio::fs::create_dir_all(&dir).await.map_err(io_err(&dir))?;

        let path = dir.join(name);
        tokio::fs::write(&path, bytes).await.map_err(io_err(&path))?;
        Ok(UploadedFile { path })
    }

    /// Rename each `(file, target dir)` that exists in `dir`, then remove `dir`.
    async fn publish_dir(
        &self,
        dir: &Path,
        targets: Vec<(String, PathBuf)>,
    ) -> Result<(), ArtifactError> {
        for (name, target_dir) in targets {
            let from = dir.join(&name);
            match tokio::fs::metadata(&from).await {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(io_err(&from)(e)),
            }
            tokio::fs::create_dir_all(&target_dir)
                .await
                .map_err(io_err(&target_dir))?;
            let to = target_dir.join(&name);
            tokio::fs::rename(&from, &to).await.map_err(io_err(&to))?;
        }

        tokio::fs::remove_dir_all(dir).await.map_err(io_err(dir))
    }
}

async fn resolve_in(dir: &Path, filename: &str) -> Option<PathBuf> {
    if !is_safe_filename(filename) {
        return None;
    }
    let path = dir.join(filename);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Some(path),
        _ => None,
    }
}

async fn remove_any(path: &Path) -> Result<(), ArtifactError> {
    let meta = tokio::fs::symlink_metadata(path).await.map_err(io_err(path))?;
    let result = if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    result.map_err(io_err(path))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use roadwatch_db::models::accident_record::CreateAccidentRecord;

    use super::*;
    use crate::sink::StoreError;

    #[derive(Default)]
    struct KnownEvents(Mutex<HashSet<Uuid>>);

    #[async_trait]
    impl RecordSink for KnownEvents {
        async fn insert(&self, record: &CreateAccidentRecord) -> Result<(), StoreError> {
            self.0.lock().unwrap().insert(record.event_id);
            Ok(())
        }

        async fn contains(&self, event_id: Uuid) -> Result<bool, StoreError> {
            Ok(self.0.lock().unwrap().contains(&event_id))
        }
    }

    async fn store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("media"));
        store.ensure_layout().await.unwrap();
        (dir, store)
    }

    async fn stage_both(store: &ArtifactStore, event_id: Uuid) -> StagedEvent {
        let mut staged = store.begin(event_id).await.unwrap();
        store.stage_frame(&mut staged, b"jpeg").await.unwrap();
        tokio::fs::write(staged.clip_path(), b"mp4").await.unwrap();
        staged.mark_clip_written();
        staged
    }

    #[tokio::test]
    async fn layout_is_created() {
        let (_dir, store) = store().await;
        for dir in [
            store.videos_dir(),
            store.images_dir(),
            store.staging_dir(),
            store.uploads_dir(),
        ] {
            assert!(dir.is_dir(), "{} missing", dir.display());
        }
    }

    #[tokio::test]
    async fn write_check_leaves_nothing_behind() {
        let (dir, store) = store().await;
        store.check_writable().await.unwrap();

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(store.root()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        assert_eq!(names, ["images", "staging", "uploads", "videos"]);

        let absent = ArtifactStore::new(dir.path().join("absent"));
        assert!(absent.check_writable().await.is_err());
    }

    #[tokio::test]
    async fn publish_moves_artifacts_and_removes_staging() {
        let (_dir, store) = store().await;
        let event_id = Uuid::new_v4();
        let staged = stage_both(&store, event_id).await;
        assert_eq!(staged.frame.as_deref(), Some(frame_filename(event_id).as_str()));

        store.publish(&staged).await.unwrap();

        assert!(!staged.dir().exists());
        assert!(store.videos_dir().join(clip_filename(event_id)).is_file());
        assert!(store.images_dir().join(frame_filename(event_id)).is_file());
        assert!(store.resolve_video(&clip_filename(event_id)).await.is_some());
        assert!(store.resolve_image(&frame_filename(event_id)).await.is_some());
    }

    #[tokio::test]
    async fn publish_without_clip() {
        let (_dir, store) = store().await;
        let event_id = Uuid::new_v4();
        let mut staged = store.begin(event_id).await.unwrap();
        store.stage_frame(&mut staged, b"jpeg").await.unwrap();

        store.publish(&staged).await.unwrap();

        assert!(staged.clip.is_none());
        assert!(!store.videos_dir().join(clip_filename(event_id)).exists());
        assert!(store.images_dir().join(frame_filename(event_id)).is_file());
    }

    #[tokio::test]
    async fn publish_skips_unrecorded_partial_clip() {
        let (_dir, store) = store().await;
        let event_id = Uuid::new_v4();
        let mut staged = store.begin(event_id).await.unwrap();
        store.stage_frame(&mut staged, b"jpeg").await.unwrap();
        // Left behind by an encoder that failed midway.
        tokio::fs::write(staged.clip_path(), b"trunc").await.unwrap();

        store.publish(&staged).await.unwrap();

        assert!(!staged.dir().exists());
        assert!(!store.videos_dir().join(clip_filename(event_id)).exists());
        assert!(store.images_dir().join(frame_filename(event_id)).is_file());
    }

    #[tokio::test]
    async fn discard_removes_staging() {
        let (_dir, store) = store().await;
        let event_id = Uuid::new_v4();
        let staged = stage_both(&store, event_id).await;

        store.discard(event_id).await.unwrap();
        assert!(!staged.dir().exists());
        // Idempotent.
        store.discard(event_id).await.unwrap();
    }

    #[tokio::test]
    async fn recovery_publishes_committed_and_discards_orphans() {
        let (_dir, store) = store().await;
        let committed = Uuid::new_v4();
        let orphan = Uuid::new_v4();
        stage_both(&store, committed).await;
        stage_both(&store, orphan).await;
        tokio::fs::create_dir_all(store.staging_dir().join("not-an-event"))
            .await
            .unwrap();

        let sink = KnownEvents::default();
        sink.0.lock().unwrap().insert(committed);

        let report = store.recover_staging(&sink).await.unwrap();

        assert_eq!(report.published, vec![committed]);
        assert_eq!(report.discarded, vec![orphan]);
        assert!(store.videos_dir().join(clip_filename(committed)).is_file());
        assert!(!store.videos_dir().join(clip_filename(orphan)).exists());
        assert!(!store.images_dir().join(frame_filename(orphan)).exists());

        let mut remaining = tokio::fs::read_dir(store.staging_dir()).await.unwrap();
        assert!(remaining.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recovery_without_staging_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("absent"));
        let report = store.recover_staging(&KnownEvents::default()).await.unwrap();
        assert_eq!(report, RecoveryReport::default());
    }

    #[tokio::test]
    async fn resolve_rejects_traversal_and_missing() {
        let (dir, store) = store().await;
        tokio::fs::write(dir.path().join("media").join("secret.txt"), b"x")
            .await
            .unwrap();

        assert!(store.resolve_image("../secret.txt").await.is_none());
        assert!(store.resolve_image("..").await.is_none());
        assert!(store.resolve_video("missing.mp4").await.is_none());
    }

    #[tokio::test]
    async fn uploads_are_removed_on_drop() {
        let (_dir, store) = store().await;
        let upload = store.save_upload(Some("mp4"), b"data").await.unwrap();
        let path = upload.path().to_path_buf();
        assert!(path.is_file());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp4"));

        drop(upload);
        assert!(!path.exists());
    }
}
