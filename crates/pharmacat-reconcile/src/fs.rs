//! Resolving image references against the image root.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use pharmacat_core::{is_remote_reference, ProductImage};

/// State of an image reference on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageCheck {
    /// A non-empty regular file.
    Present,
    /// Off-host URL; not inspected.
    Remote,
    /// Absent, empty, or not a usable path. The string says which.
    Missing(String),
    /// The file could not be inspected; handled like `Missing`.
    Unreadable(String),
}

impl ImageCheck {
    /// `true` when the row pointing at this reference should be removed.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        matches!(self, Self::Missing(_) | Self::Unreadable(_))
    }
}

/// Maps a stored reference to a path under `root`.
///
/// References are web paths: any `?query` or `#fragment` is dropped, the
/// rest is percent-decoded, and leading slashes are removed so
/// `/uploads/x.jpg` resolves under the root. Returns `None` for empty
/// references, undecodable ones, and ones that would leave the root.
#[must_use]
pub fn resolve_reference(root: &Path, reference: &str) -> Option<PathBuf> {
    let path = reference.trim().split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    let relative = decoded.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }

    let relative = Path::new(relative);
    let escapes = relative.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return None;
    }

    Some(root.join(relative))
}

/// Inspects the file a reference points at.
#[must_use]
pub fn check_location(root: &Path, reference: &str) -> ImageCheck {
    if is_remote_reference(reference) {
        return ImageCheck::Remote;
    }
    let Some(path) = resolve_reference(root, reference) else {
        return ImageCheck::Missing("reference is empty or leaves the image root".to_string());
    };

    match std::fs::metadata(&path) {
        Ok(meta) if !meta.is_file() => ImageCheck::Missing("not a regular file".to_string()),
        Ok(meta) if meta.len() == 0 => ImageCheck::Missing("file is empty".to_string()),
        Ok(_) => ImageCheck::Present,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            ImageCheck::Missing("file not found".to_string())
        }
        Err(err) => ImageCheck::Unreadable(format!("stat {} failed: {err}", path.display())),
    }
}

/// Inspects the file behind `image`.
#[must_use]
pub fn check_reference(root: &Path, image: &ProductImage) -> ImageCheck {
    let check = check_location(root, &image.image_url);
    if let ImageCheck::Unreadable(reason) = &check {
        tracing::warn!(
            image_id = image.id,
            error = %reason,
            "could not stat image; treating as missing"
        );
    }
    check
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(url: &str) -> ProductImage {
        ProductImage {
            id: 1,
            product_id: 1,
            image_url: url.to_string(),
            sort_order: 0,
            is_primary: true,
        }
    }

    #[test]
    fn web_path_resolves_under_root() {
        let root = Path::new("/srv/public");
        assert_eq!(
            resolve_reference(root, "/uploads/images/a.jpg"),
            Some(PathBuf::from("/srv/public/uploads/images/a.jpg"))
        );
        assert_eq!(
            resolve_reference(root, "uploads/a.jpg"),
            Some(PathBuf::from("/srv/public/uploads/a.jpg"))
        );
    }

    #[test]
    fn parent_components_and_blanks_are_rejected() {
        let root = Path::new("/srv/public");
        assert_eq!(resolve_reference(root, "/uploads/../../etc/passwd"), None);
        assert_eq!(resolve_reference(root, "   "), None);
        assert_eq!(resolve_reference(root, "/"), None);
    }

    #[test]
    fn check_distinguishes_present_empty_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
        std::fs::write(dir.path().join("uploads/ok.jpg"), b"jpeg").unwrap();
        std::fs::write(dir.path().join("uploads/empty.jpg"), b"").unwrap();

        assert_eq!(
            check_reference(dir.path(), &image("/uploads/ok.jpg")),
            ImageCheck::Present
        );
        assert_eq!(
            check_reference(dir.path(), &image("/uploads/empty.jpg")),
            ImageCheck::Missing("file is empty".to_string())
        );
        assert_eq!(
            check_reference(dir.path(), &image("/uploads/missing.jpg")),
            ImageCheck::Missing("file not found".to_string())
        );
        assert!(matches!(
            check_reference(dir.path(), &image("/uploads")),
            ImageCheck::Missing(_)
        ));
    }

    #[test]
    fn query_and_fragment_are_ignored() {
        let root = Path::new("/srv/public");
        assert_eq!(
            resolve_reference(root, "/uploads/images/b.jpg?v=2"),
            Some(PathBuf::from("/srv/public/uploads/images/b.jpg"))
        );
        assert_eq!(
            resolve_reference(root, "/uploads/images/b.jpg#zoom"),
            Some(PathBuf::from("/srv/public/uploads/images/b.jpg"))
        );
    }

    #[test]
    fn percent_escapes_are_decoded() {
        let root = Path::new("/srv/public");
        assert_eq!(
            resolve_reference(root, "/uploads/images/vichy%20cream.jpg"),
            Some(PathBuf::from("/srv/public/uploads/images/vichy cream.jpg"))
        );
        assert_eq!(resolve_reference(root, "/uploads/%2e%2e/%2e%2e/etc/passwd"), None);
        assert_eq!(resolve_reference(root, "/uploads/%ff.jpg"), None);
    }

    #[test]
    fn encoded_and_versioned_references_find_their_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("uploads/images")).unwrap();
        std::fs::write(dir.path().join("uploads/images/vichy cream.jpg"), b"jpeg").unwrap();
        std::fs::write(dir.path().join("uploads/images/b.jpg"), b"jpeg").unwrap();

        assert_eq!(
            check_location(dir.path(), "/uploads/images/vichy%20cream.jpg"),
            ImageCheck::Present
        );
        assert_eq!(
            check_location(dir.path(), "/uploads/images/b.jpg?v=2"),
            ImageCheck::Present
        );
    }

    #[test]
    fn stat_errors_are_unreadable_and_broken() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"jpeg").unwrap();

        let check = check_reference(dir.path(), &image("/a.jpg/nested.jpg"));
        assert!(matches!(check, ImageCheck::Unreadable(_)), "got {check:?}");
        assert!(check.is_broken());
        assert!(!ImageCheck::Present.is_broken());
        assert!(!ImageCheck::Remote.is_broken());
    }

    #[test]
    fn remote_references_are_not_inspected() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            check_reference(dir.path(), &image("https://cdn.example.com/a.jpg")),
            ImageCheck::Remote
        );
    }
}
