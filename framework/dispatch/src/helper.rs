use std::path::{Path, PathBuf};

/// Find the marker helper program.
///
/// A path containing a directory separator is used as given. A bare name is looked up in the
/// user's `PATH` first and then in the working directory, so that the default `send_marker.sh`
/// sitting next to the experiment works without a `./` prefix.
///
/// Returns `None` when nothing executable is found. The lookup is repeated for every marker, so a
/// helper that appears mid-experiment is picked up by the next one.
pub fn resolve_helper(helper: &Path) -> Option<PathBuf> {
    if helper.as_os_str().is_empty() {
        return None;
    }

    if let Ok(found) = which::which(helper) {
        return Some(found);
    }

    let is_bare_name = helper.components().count() == 1 && !helper.is_absolute();
    if is_bare_name {
        log::trace!(
            "'{}' not found in PATH, looking in the working directory",
            helper.display()
        );
        return which::which(Path::new(".").join(helper)).ok();
    }

    None
}
