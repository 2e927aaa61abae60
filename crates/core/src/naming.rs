//! Artifact naming and media directory layout.
//!
//! Artifacts live under a single media root:
//!
//! ```text
//! <root>/videos/accident_clip_<event_id>.mp4
//! <root>/images/accident_frame_<event_id>.jpg
//! <root>/staging/<event_id>/...        in-flight commits
//! <root>/uploads/<upload_id>.<ext>     uploads being decoded
//! ```

use uuid::Uuid;

/// Published accident clips.
pub const VIDEOS_DIR: &str = "videos";

/// Published accident frames.
pub const IMAGES_DIR: &str = "images";

/// Artifacts of events whose record has not been committed yet.
pub const STAGING_DIR: &str = "staging";

/// Raw uploads while they are being decoded.
pub const UPLOADS_DIR: &str = "uploads";

/// Clip file name for an accident event.
pub fn clip_filename(event_id: Uuid) -> String {
    format!("accident_clip_{event_id}.mp4")
}

/// Frame image file name for an accident event.
pub fn frame_filename(event_id: Uuid) -> String {
    format!("accident_frame_{event_id}.jpg")
}

/// Path stored in the record for a published clip (`videos/<file>`).
pub fn stored_video_path(filename: &str) -> String {
    format!("{VIDEOS_DIR}/{filename}")
}

/// Path stored in the record for a published frame (`images/<file>`).
pub fn stored_image_path(filename: &str) -> String {
    format!("{IMAGES_DIR}/{filename}")
}

/// Public URL path of a clip.
pub fn video_url(filename: &str) -> String {
    format!("/accident_video/{filename}")
}

/// Public URL path of a frame.
pub fn frame_url(filename: &str) -> String {
    format!("/accident_frame/{filename}")
}

/// Whether `name` is a bare file name safe to join onto a media directory.
///
/// Only ASCII letters, digits, `.`, `_` and `-` are allowed, and the name may
/// not start with a dot. This rules out separators, `..` and hidden files.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Lowercased extension of an uploaded file name, if it has one.
pub fn file_extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_share_the_event_id() {
        let id = Uuid::nil();
        assert_eq!(
            clip_filename(id),
            "accident_clip_00000000-0000-0000-0000-000000000000.mp4"
        );
        assert_eq!(
            frame_filename(id),
            "accident_frame_00000000-0000-0000-0000-000000000000.jpg"
        );
    }

    #[test]
    fn distinct_events_get_distinct_names() {
        assert_ne!(clip_filename(Uuid::new_v4()), clip_filename(Uuid::new_v4()));
    }

    #[test]
    fn stored_paths_and_urls() {
        assert_eq!(stored_video_path("a.mp4"), "videos/a.mp4");
        assert_eq!(stored_image_path("a.jpg"), "images/a.jpg");
        assert_eq!(video_url("a.mp4"), "/accident_video/a.mp4");
        assert_eq!(frame_url("a.jpg"), "/accident_frame/a.jpg");
    }

    #[test]
    fn safe_filenames() {
        assert!(is_safe_filename("accident_clip_1.mp4"));
        assert!(is_safe_filename(&frame_filename(Uuid::new_v4())));
    }

    #[test]
    fn unsafe_filenames() {
        assert!(!is_safe_filename(""));
        assert!(!is_safe_filename(".."));
        assert!(!is_safe_filename(".env"));
        assert!(!is_safe_filename("../secret.jpg"));
        assert!(!is_safe_filename("a/b.jpg"));
        assert!(!is_safe_filename("a\\b.jpg"));
        assert!(!is_safe_filename("clip%2e.mp4"));
    }

    #[test]
    fn extensions() {
        assert_eq!(file_extension("dashcam.MP4"), Some("mp4".into()));
        assert_eq!(file_extension("a.b.mov"), Some("mov".into()));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension("trailing."), None);
        assert_eq!(file_extension("x.m p4"), None);
    }
}
