use std::fs;
use std::path::{Path, PathBuf};

use texcompile_lib::Format;

/// Output discovery, performed after the container exits (spec §4.3).
/// Missing expected output is not an error at this layer; it is surfaced
/// as `artifact` being `None`.
pub fn discover_output(
    workspace: &Path,
    output_format: Format,
    captured_stdout: &[u8],
) -> std::io::Result<(Option<PathBuf>, Option<PathBuf>)> {
    let artifact = find_artifact(workspace, output_format)?;
    let log = ensure_log(workspace, captured_stdout)?;
    Ok((artifact, Some(log)))
}

fn find_artifact(workspace: &Path, output_format: Format) -> std::io::Result<Option<PathBuf>> {
    let cache_dir = workspace.join("tex_cache");
    if !cache_dir.is_dir() {
        return Ok(None);
    }
    let ext = output_format.ext();
    for entry in fs::read_dir(&cache_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn ensure_log(workspace: &Path, captured_stdout: &[u8]) -> std::io::Result<PathBuf> {
    let log_path = workspace.join("tex_logs").join("autotex.log");
    let needs_fallback = match fs::metadata(&log_path) {
        Ok(meta) => meta.len() == 0,
        Err(_) => true,
    };
    if needs_fallback {
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&log_path, captured_stdout)?;
    }
    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finds_artifact_by_extension_in_tex_cache() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("tex_cache");
        fs::create_dir_all(&cache).unwrap();
        fs::write(cache.join("54.pdf"), b"%PDF-1.4").unwrap();

        let (artifact, _) = discover_output(dir.path(), Format::Pdf, b"").unwrap();
        assert_eq!(artifact, Some(cache.join("54.pdf")));
    }

    #[test]
    fn no_artifact_when_tex_cache_is_absent() {
        let dir = tempdir().unwrap();
        let (artifact, _) = discover_output(dir.path(), Format::Pdf, b"").unwrap();
        assert_eq!(artifact, None);
    }

    #[test]
    fn falls_back_to_captured_stdout_when_log_missing() {
        let dir = tempdir().unwrap();
        let (_, log) = discover_output(dir.path(), Format::Pdf, b"compile output").unwrap();
        let log_path = log.unwrap();
        assert_eq!(fs::read(&log_path).unwrap(), b"compile output");
    }

    #[test]
    fn falls_back_when_log_is_zero_length() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("tex_logs");
        fs::create_dir_all(&logs).unwrap();
        fs::write(logs.join("autotex.log"), b"").unwrap();

        let (_, log) = discover_output(dir.path(), Format::Pdf, b"fallback").unwrap();
        assert_eq!(fs::read(log.unwrap()).unwrap(), b"fallback");
    }

    #[test]
    fn preserves_nonempty_log() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("tex_logs");
        fs::create_dir_all(&logs).unwrap();
        fs::write(logs.join("autotex.log"), b"real log").unwrap();

        let (_, log) = discover_output(dir.path(), Format::Pdf, b"ignored").unwrap();
        assert_eq!(fs::read(log.unwrap()).unwrap(), b"real log");
    }
}
