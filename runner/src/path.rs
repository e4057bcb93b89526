use std::path::{Path, PathBuf};

/// Cross-host bind-mount translation (spec §4.3): the worker writes sources
/// under `worker_root`; the converter host sees the same volume under
/// `dind_root`. `leaf = workspace_path - worker_root`, and the container is
/// started with `dind_root/leaf` bound to `/autotex`.
pub fn translate_to_host_path(
    workspace_path: &Path,
    worker_root: &Path,
    dind_root: &Path,
) -> Option<PathBuf> {
    let leaf = workspace_path.strip_prefix(worker_root).ok()?;
    Some(dind_root.join(leaf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_leaf_onto_dind_root() {
        let host_path = translate_to_host_path(
            Path::new("/worker/scratch/54"),
            Path::new("/worker/scratch"),
            Path::new("/dind/scratch"),
        )
        .unwrap();
        assert_eq!(host_path, Path::new("/dind/scratch/54"));
    }

    #[test]
    fn none_when_workspace_is_outside_worker_root() {
        assert!(translate_to_host_path(
            Path::new("/elsewhere/54"),
            Path::new("/worker/scratch"),
            Path::new("/dind/scratch"),
        )
        .is_none());
    }
}
