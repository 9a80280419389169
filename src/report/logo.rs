use std::path::{Path, PathBuf};

const LOGO_FILE: &str = "diabetes-icon1.png";

/// Places the clinic logo is looked up, in order. A configured path wins.
pub fn candidate_paths(configured: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(4);
    if let Some(path) = configured {
        paths.push(path.to_path_buf());
    }
    paths.push(Path::new("assets").join(LOGO_FILE));
    paths.push(Path::new("backend").join("assets").join(LOGO_FILE));
    paths.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("assets").join(LOGO_FILE));
    paths
}

/// Best effort: returns the first readable candidate, or `None`.
pub fn load_logo(candidates: &[PathBuf]) -> Option<Vec<u8>> {
    for path in candidates {
        if !path.exists() {
            continue;
        }
        match std::fs::read(path) {
            Ok(bytes) => {
                tracing::debug!("Loaded logo from {}", path.display());
                return Some(bytes);
            }
            Err(e) => {
                tracing::warn!("Error loading logo from {}: {}", path.display(), e);
            }
        }
    }

    tracing::warn!("Logo image not found, proceeding without it");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_path_is_tried_first() {
        let paths = candidate_paths(Some(Path::new("/srv/logo.png")));
        assert_eq!(paths[0], PathBuf::from("/srv/logo.png"));
        assert_eq!(paths.len(), 4);
        assert!(paths.iter().skip(1).all(|p| p.ends_with(LOGO_FILE)));
    }

    #[test]
    fn test_missing_logo_degrades_to_none() {
        let candidates = vec![PathBuf::from("no/such/dir/logo.png")];
        assert!(load_logo(&candidates).is_none());
    }

    #[test]
    fn test_first_existing_candidate_wins() {
        let path = std::env::temp_dir().join(format!("logo-test-{}.png", std::process::id()));
        std::fs::write(&path, b"not really a png").unwrap();

        let candidates = vec![PathBuf::from("no/such/logo.png"), path.clone()];
        let loaded = load_logo(&candidates);
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.as_deref(), Some(&b"not really a png"[..]));
    }

    #[test]
    fn test_bundled_logo_is_found() {
        let candidates = candidate_paths(None);
        assert!(load_logo(&candidates).is_some());
    }
}
