use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use model::Snapshot;
use tokio::{fs, io::AsyncWriteExt as _};
use utility::serde::timestamp;

use crate::{Result, SnapshotStorage};

/// Stores the snapshot as a pretty-printed JSON document.
///
/// Saves go to a sibling temp file which is flushed to disk and then renamed
/// over the real file, so a crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| OsString::from("snapshot.json"));
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    /// A free `<file>.corrupt-<timestamp>` name, so earlier quarantined
    /// documents are never replaced.
    async fn corrupt_path(&self) -> Result<PathBuf> {
        let stamp = timestamp::now().format("%Y%m%d-%H%M%S").to_string();
        let base = format!(".corrupt-{}", stamp);
        let mut candidate = self.sibling(&base);
        let mut counter = 1;
        while fs::try_exists(&candidate).await? {
            candidate = self.sibling(&format!("{}-{}", base, counter));
            counter += 1;
        }
        Ok(candidate)
    }

    async fn write_and_replace(&self, temp_path: &Path, bytes: &[u8]) -> Result<()> {
        let mut file = fs::File::create(temp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStorage for JsonFileStorage {
    async fn load(&self) -> Result<Option<Snapshot>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(why) if why.kind() == ErrorKind::NotFound => return Ok(None),
            Err(why) => return Err(why.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.temp_path();
        let result = self.write_and_replace(&temp_path, &bytes).await;
        if result.is_err() {
            if let Err(why) = fs::remove_file(&temp_path).await {
                log::debug!("could not remove {}: {}", temp_path.display(), why);
            }
        }
        result
    }

    async fn quarantine(&self) -> Result<()> {
        let target = self.corrupt_path().await?;
        fs::rename(&self.path, &target).await?;
        log::warn!(
            "moved unreadable snapshot {} to {}",
            self.path.display(),
            target.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use itertools::Itertools;
    use model::{Coordinate, CoveragePolygon, Point};
    use tempfile::TempDir;

    use super::*;

    fn quarantined(dir: &TempDir) -> Vec<PathBuf> {
        std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("points.json.corrupt-"))
            })
            .collect()
    }

    fn snapshot() -> Snapshot {
        let time = NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(18, 2, 41)
            .unwrap();
        Snapshot::new(
            vec![
                Point::new(Coordinate::new(37.1, -122.2), time),
                Point::new(Coordinate::new(37.15, -122.25), time),
            ],
            CoveragePolygon::new(vec![
                Coordinate::new(37.1, -122.2),
                Coordinate::new(37.15, -122.25),
            ]),
        )
    }

    #[tokio::test]
    async fn missing_file_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("points.json"));
        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("data").join("points.json"));

        storage.save(&snapshot()).await.unwrap();

        assert_eq!(storage.load().await.unwrap(), Some(snapshot()));
        assert!(!storage.temp_path().exists());
    }

    #[tokio::test]
    async fn save_replaces_previous_document() {
        let dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("points.json"));

        storage.save(&snapshot()).await.unwrap();
        storage.save(&Snapshot::empty()).await.unwrap();

        assert_eq!(storage.load().await.unwrap(), Some(Snapshot::empty()));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error_and_can_be_quarantined() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("points.json");
        std::fs::write(&path, b"{\"points\": [").unwrap();
        let storage = JsonFileStorage::new(&path);

        assert!(matches!(
            storage.load().await,
            Err(crate::StorageError::Corrupt(_))
        ));

        storage.quarantine().await.unwrap();
        assert!(!path.exists());
        assert_eq!(quarantined(&dir).len(), 1);
        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn repeated_quarantine_keeps_every_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("points.json");
        let storage = JsonFileStorage::new(&path);

        std::fs::write(&path, "first").unwrap();
        storage.quarantine().await.unwrap();
        std::fs::write(&path, "second").unwrap();
        storage.quarantine().await.unwrap();

        let contents = quarantined(&dir)
            .iter()
            .map(|path| std::fs::read_to_string(path).unwrap())
            .sorted()
            .collect::<Vec<_>>();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn failed_save_keeps_previous_document() {
        let dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("points.json"));
        storage.save(&snapshot()).await.unwrap();

        // a directory squatting on the temp path makes the write fail
        std::fs::create_dir(storage.temp_path()).unwrap();
        assert!(storage.save(&Snapshot::empty()).await.is_err());

        assert_eq!(storage.load().await.unwrap(), Some(snapshot()));
    }

    #[tokio::test]
    async fn failed_replace_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("points.json");
        // a non-empty directory cannot be replaced by a file
        std::fs::create_dir_all(path.join("occupied")).unwrap();
        let storage = JsonFileStorage::new(&path);

        assert!(storage.save(&snapshot()).await.is_err());

        assert!(!storage.temp_path().exists());
        assert!(path.join("occupied").exists());
    }

    #[tokio::test]
    async fn reads_documents_written_by_hand() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("points.json");
        std::fs::write(
            &path,
            r#"{"points": [{"lat": 1.0, "lon": 2.0, "time": "2024-01-01 00:00:00"}], "coverage": []}"#,
        )
        .unwrap();

        let loaded = JsonFileStorage::new(&path).load().await.unwrap().unwrap();
        assert_eq!(loaded.points().len(), 1);
        assert_eq!(loaded.points()[0].coordinate(), Coordinate::new(1.0, 2.0));
    }
}
