use std::path::{Path, PathBuf};

use crate::error::SourceError;

/// Derives a destination filename from a `content-disposition` header's
/// `filename=` parameter, falling back to `{source_id}.tar.gz`.
pub fn derive_filename(content_disposition: Option<&str>, source_id: &str) -> String {
    content_disposition
        .and_then(extract_filename_param)
        .unwrap_or_else(|| format!("{source_id}.tar.gz"))
}

fn extract_filename_param(header: &str) -> Option<String> {
    header.split(';').find_map(|part| {
        let part = part.trim();
        part.strip_prefix("filename=")
            .map(|v| v.trim_matches('"').to_string())
    })
}

/// Joins `filename` onto `save_to`, rejecting any filename that, after
/// normalization, would escape `save_to` (spec §4.5, testable property 7).
/// The file need not exist yet, so this is a pure lexical check rather than
/// `canonicalize`.
pub fn safe_join(save_to: &Path, filename: &str) -> Result<PathBuf, SourceError> {
    use std::path::Component;

    let candidate = Path::new(filename);
    let mut depth: i64 = 0;
    for component in candidate.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return Err(SourceError::UnsafePath(filename.to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(SourceError::UnsafePath(filename.to_string()));
            }
        }
    }
    Ok(save_to.join(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_filename_from_content_disposition() {
        assert_eq!(
            derive_filename(Some("attachment; filename=\"paper.tar.gz\""), "54"),
            "paper.tar.gz"
        );
    }

    #[test]
    fn falls_back_to_source_id_tarball() {
        assert_eq!(derive_filename(None, "54"), "54.tar.gz");
    }

    #[test]
    fn accepts_plain_filename() {
        let save_to = Path::new("/tmp/save");
        assert!(safe_join(save_to, "54.tar.gz").is_ok());
    }

    #[test]
    fn rejects_absolute_path() {
        let save_to = Path::new("/tmp/save");
        assert!(safe_join(save_to, "/etc/passwd").is_err());
    }

    #[test]
    fn rejects_traversal_above_save_to() {
        let save_to = Path::new("/tmp/save");
        assert!(safe_join(save_to, "../../etc/passwd").is_err());
    }

    #[test]
    fn allows_traversal_that_stays_inside_save_to() {
        let save_to = Path::new("/tmp/save");
        assert!(safe_join(save_to, "sub/../54.tar.gz").is_ok());
    }
}
