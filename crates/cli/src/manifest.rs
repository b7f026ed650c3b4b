//! Media manifest loading.
//!
//! A manifest is a JSON document listing the extracted media for one video:
//! frame image paths per sampling method and audio file paths per audio
//! key. Relative paths resolve against the manifest's own directory. Frame
//! files are read and base64-encoded here, so the engine only ever sees
//! ready-to-send payloads.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cliplens_core::media::{FrameRef, MediaBundle};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The raw JSON shape of a media manifest.
#[derive(Debug, Deserialize)]
struct MediaManifest {
    /// Frame image paths per sampling method (e.g. "regular_1s").
    #[serde(default)]
    frames: HashMap<String, Vec<PathBuf>>,

    /// Audio file paths per audio key (e.g. "main_audio").
    #[serde(default)]
    audio: HashMap<String, Vec<PathBuf>>,
}

/// Load a manifest and materialize it into a [`MediaBundle`].
pub fn load(path: &Path) -> Result<MediaBundle, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let manifest: MediaManifest =
        serde_json::from_str(&content).map_err(|e| ManifestError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let base = path.parent().unwrap_or(Path::new("."));
    let mut bundle = MediaBundle::new();

    for (method, paths) in manifest.frames {
        let mut refs = Vec::with_capacity(paths.len());
        for frame_path in paths {
            let resolved = resolve(base, &frame_path);
            let bytes = std::fs::read(&resolved).map_err(|e| ManifestError::Read {
                path: resolved.clone(),
                reason: e.to_string(),
            })?;
            refs.push(FrameRef::from_path(resolved, STANDARD.encode(bytes)));
        }
        debug!(method = %method, frames = refs.len(), "Loaded frame list");
        bundle.frames.insert(method, refs);
    }

    for (key, paths) in manifest.audio {
        let resolved = paths.iter().map(|p| resolve(base, p)).collect();
        bundle.audio.insert(key, resolved);
    }

    Ok(bundle)
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    #[test]
    fn frames_are_read_and_encoded() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "f0.jpg", b"jpeg-bytes-0");
        write_file(dir.path(), "f1.jpg", b"jpeg-bytes-1");
        let manifest_path = write_file(
            dir.path(),
            "media.json",
            br#"{"frames": {"regular_1s": ["f0.jpg", "f1.jpg"]}}"#,
        );

        let bundle = load(&manifest_path).unwrap();
        let frames = bundle.frames_for("regular_1s").unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].jpeg_b64, STANDARD.encode(b"jpeg-bytes-0"));
        assert_eq!(frames[1].jpeg_b64, STANDARD.encode(b"jpeg-bytes-1"));
        assert_eq!(frames[0].source.as_deref(), Some(dir.path().join("f0.jpg").as_path()));
    }

    #[test]
    fn audio_paths_resolve_against_the_manifest_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = write_file(
            dir.path(),
            "media.json",
            br#"{"audio": {"main_audio": ["clips/voice.mp3"]}}"#,
        );

        let bundle = load(&manifest_path).unwrap();
        let audio = bundle.audio_for("main_audio").unwrap();
        assert_eq!(audio, [dir.path().join("clips/voice.mp3")]);
    }

    #[test]
    fn missing_frame_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = write_file(
            dir.path(),
            "media.json",
            br#"{"frames": {"regular_1s": ["nope.jpg"]}}"#,
        );

        let err = load(&manifest_path).unwrap_err();
        assert!(matches!(err, ManifestError::Read { .. }));
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = write_file(dir.path(), "media.json", b"{not json");

        let err = load(&manifest_path).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
    }

    #[test]
    fn empty_manifest_is_an_empty_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = write_file(dir.path(), "media.json", b"{}");

        let bundle = load(&manifest_path).unwrap();
        assert!(bundle.frames.is_empty());
        assert!(bundle.audio.is_empty());
    }
}
