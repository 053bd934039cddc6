//! Synthesis output placement and scoped file writes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::SpeechError;
use crate::speech::types::AudioFormat;

/// Base name for adapter-chosen output files
pub const DEFAULT_OUTPUT_STEM: &str = "cantonese_tts_output";

/// Pick the absolute destination for synthesized audio.
///
/// A caller-supplied path wins (relative ones are anchored at
/// `working_dir`). Otherwise the file is `<output_dir>/cantonese_tts_output.<ext>`.
pub fn resolve_output_path(
    requested: Option<&Path>,
    working_dir: &Path,
    output_dir: &Path,
    format: AudioFormat,
) -> PathBuf {
    match requested {
        Some(path) => absolutize(path, working_dir),
        None => absolutize(output_dir, working_dir)
            .join(format!("{}.{}", DEFAULT_OUTPUT_STEM, format.extension())),
    }
}

pub fn absolutize(path: &Path, working_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

/// Prefix and suffix of the sibling temp file a write goes through
fn partial_affixes(path: &Path) -> (OsString, &'static str) {
    let mut prefix = OsString::from(".");
    prefix.push(
        path.file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new(DEFAULT_OUTPUT_STEM)),
    );
    prefix.push(".");
    (prefix, ".part")
}

/// Write `bytes` to `path` so that either the whole file lands or nothing does.
///
/// Bytes go to a uniquely named sibling `.part` file that is flushed and
/// synced before being renamed into place, so concurrent writes to the same
/// destination never share a temp file; the last rename wins. The temp file
/// is removed on every failure path when its `TempPath` drops.
pub async fn write_audio(path: &Path, bytes: &[u8]) -> Result<u64, SpeechError> {
    let io_error = |e: std::io::Error| SpeechError::LocalIo {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent).await.map_err(io_error)?;

    let (prefix, suffix) = partial_affixes(path);
    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix).suffix(suffix);
    // temp files default to 0600; audio output is an ordinary file
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }
    let (file, part) = builder.tempfile_in(parent).map_err(io_error)?.into_parts();

    write_synced(tokio::fs::File::from_std(file), bytes)
        .await
        .map_err(io_error)?;

    part.persist(path).map_err(|e| io_error(e.error))?;

    tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(bytes.len() as u64)
}

async fn write_synced(mut file: tokio::fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}
