//! Stockage des images produit sur disque: `<upload_dir>/<category_id>/<uuid>_<nom>`.

use std::path::PathBuf;

use uuid::Uuid;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Écrit le fichier et renvoie son chemin relatif (stocké en base)
    pub async fn save(&self, category_id: i32, file_name: &str, bytes: &[u8]) -> AppResult<String> {
        let dir = self.root.join(category_id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload dir: {}", e)))?;

        let stored = format!("{}_{}", Uuid::new_v4(), sanitize_file_name(file_name));
        let path = dir.join(&stored);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write image: {}", e)))?;

        Ok(path.to_string_lossy().into_owned())
    }
}

/// Ne garde que [A-Za-z0-9._-], sans point en tête (pas de ../ ni de fichier caché)
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("photo 1.png"), "photo_1.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("..."), "image");
        assert_eq!(sanitize_file_name("C:\\tmp\\é.jpg"), "_.jpg");
    }

    #[tokio::test]
    async fn test_save_writes_under_category_dir() {
        let root = std::env::temp_dir().join(format!("shop-images-{}", Uuid::new_v4()));
        let store = ImageStore::new(&root);

        let path = store.save(7, "shoe.png", b"png").await.unwrap();
        assert!(path.starts_with(root.join("7").to_string_lossy().as_ref()));
        assert!(path.ends_with("_shoe.png"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"png");

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
