use std::path::{Component, Path, PathBuf};

use crate::model::subject_folder_name;

/// Reduces an uploaded filename to a safe single path component.
///
/// Path separators become spaces, runs of whitespace collapse into `_`,
/// anything outside `[A-Za-z0-9_.-]` is dropped and leading/trailing dots
/// and underscores are trimmed. Returns `None` when nothing usable is left.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let spaced = filename.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Where an uploaded material lives, both on disk and in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialLocation {
    /// Path relative to the site root, always with forward slashes
    relative: String,
    disk_path: PathBuf,
}

impl MaterialLocation {
    /// `<upload_root>/semester-<id>/<branch>/<subject folder>/<file_name>`
    pub fn new(
        site_root: &Path,
        upload_root: &Path,
        semester_id: &str,
        branch_id: &str,
        subject_name: &str,
        file_name: &str,
    ) -> Self {
        let root = to_slash(upload_root);
        let semester = format!("semester-{}", semester_id);
        let folder = subject_folder_name(subject_name);
        let relative = [
            root.as_str(),
            semester.as_str(),
            branch_id,
            folder.as_str(),
            file_name,
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/");

        let disk_path = site_root.join(&relative);
        Self {
            relative,
            disk_path,
        }
    }

    pub fn disk_path(&self) -> &Path {
        &self.disk_path
    }

    pub fn folder(&self) -> &Path {
        self.disk_path.parent().unwrap_or(&self.disk_path)
    }

    /// Form written by uploads: `/data/notes/...`
    pub fn catalog_path(&self) -> String {
        format!("/{}", self.relative)
    }

    /// Form written by the file watcher: `../data/notes/...`
    pub fn watcher_path(&self) -> String {
        format!("../{}", self.relative)
    }

    pub fn download_url(&self) -> String {
        format!("/api/download?path={}", self.catalog_path())
    }
}

fn to_slash(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let raw = raw.strip_prefix("./").unwrap_or(&raw);
    raw.trim_matches('/').to_string()
}

/// Maps a catalog path (either dedup form) to a file under `site_root`.
///
/// Returns `None` for anything that would escape the site root.
pub fn resolve_site_path(site_root: &Path, catalog_path: &str) -> Option<PathBuf> {
    let relative = catalog_path
        .strip_prefix("../")
        .or_else(|| catalog_path.strip_prefix('/'))
        .unwrap_or(catalog_path)
        .trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }

    let relative = Path::new(relative);
    let safe = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if safe {
        Some(site_root.join(relative))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("notes.txt").as_deref(), Some("notes.txt"));
        assert_eq!(
            sanitize_filename("My Unit 1 Notes.PDF").as_deref(),
            Some("My_Unit_1_Notes.PDF")
        );
        assert_eq!(
            sanitize_filename("../../etc/passwd").as_deref(),
            Some("etc_passwd")
        );
        assert_eq!(
            sanitize_filename(r"C:\Users\me\slides.pptx").as_deref(),
            Some("C_Users_me_slides.pptx")
        );
        assert_eq!(sanitize_filename("résumé.doc").as_deref(), Some("rsum.doc"));
        assert_eq!(sanitize_filename("..."), None);
        assert_eq!(sanitize_filename(""), None);
    }

    #[test]
    fn test_location_forms() {
        let location = MaterialLocation::new(
            Path::new("/srv/site"),
            Path::new("data/notes"),
            "1",
            "cse",
            "Data Structures",
            "trees.pdf",
        );
        assert_eq!(
            location.catalog_path(),
            "/data/notes/semester-1/cse/data-structures/trees.pdf"
        );
        assert_eq!(
            location.watcher_path(),
            "../data/notes/semester-1/cse/data-structures/trees.pdf"
        );
        assert_eq!(
            location.download_url(),
            "/api/download?path=/data/notes/semester-1/cse/data-structures/trees.pdf"
        );
        assert_eq!(
            location.disk_path(),
            Path::new("/srv/site/data/notes/semester-1/cse/data-structures/trees.pdf")
        );
        assert_eq!(
            location.folder(),
            Path::new("/srv/site/data/notes/semester-1/cse/data-structures")
        );
    }

    #[test]
    fn test_location_normalizes_upload_root() {
        let location = MaterialLocation::new(
            Path::new("."),
            Path::new("./data/notes/"),
            "2",
            "it",
            "OS",
            "a.pdf",
        );
        assert_eq!(location.catalog_path(), "/data/notes/semester-2/it/os/a.pdf");
    }

    #[test]
    fn test_resolve_site_path() {
        let root = Path::new("/srv/site");
        assert_eq!(
            resolve_site_path(root, "/data/notes/a.pdf"),
            Some(PathBuf::from("/srv/site/data/notes/a.pdf"))
        );
        assert_eq!(
            resolve_site_path(root, "../data/notes/a.pdf"),
            Some(PathBuf::from("/srv/site/data/notes/a.pdf"))
        );
        assert_eq!(resolve_site_path(root, "/data/../../etc/passwd"), None);
        assert_eq!(resolve_site_path(root, "../../secret"), None);
        assert_eq!(resolve_site_path(root, "/"), None);
    }
}
