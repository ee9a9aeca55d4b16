use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::info;

use crate::download;
use crate::error::OriginError;

/// Files fetched one by one, each saved under its URL's final segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSetSource {
    /// File URLs, in declaration order.
    pub locations: Vec<String>,
}

impl FileSetSource {
    pub(crate) const fn new(locations: Vec<String>) -> Self {
        Self { locations }
    }

    pub(crate) fn render(&self, dest: &Path, out: &mut dyn Write) -> io::Result<()> {
        for location in &self.locations {
            writeln!(out, "- Download {location} to {}", dest.display())?;
        }
        Ok(())
    }

    /// Download every file; the first failure aborts the set.
    pub(crate) fn fetch(&self, dest: &Path, name: &str) -> Result<(), OriginError> {
        fs::create_dir_all(dest).map_err(OriginError::io(dest))?;
        info!("Getting {name} files");
        for location in &self.locations {
            info!("Downloading {location} to {}", dest.display());
            download::download(location, dest, download::file_name(location)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::testing;
    use tempfile::TempDir;

    #[test]
    fn each_file_is_named_by_its_last_segment() {
        let base = testing::serve(vec![
            ("/pal/include/a.h", b"int a;\n".to_vec()),
            ("/pal/src/b.c", b"int b;\n".to_vec()),
        ]);
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("Middleware/pal");
        let set = FileSetSource::new(vec![
            format!("{base}/pal/include/a.h"),
            format!("{base}/pal/src/b.c"),
        ]);

        set.fetch(&dest, "pal").unwrap();

        assert_eq!(fs::read_to_string(dest.join("a.h")).unwrap(), "int a;\n");
        assert_eq!(fs::read_to_string(dest.join("b.c")).unwrap(), "int b;\n");
    }

    #[test]
    fn failing_url_aborts_the_rest_of_the_set() {
        let base = testing::serve(vec![
            ("/a.h", b"int a;\n".to_vec()),
            ("/c.h", b"int c;\n".to_vec()),
        ]);
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("files");
        let set = FileSetSource::new(vec![
            format!("{base}/a.h"),
            format!("{base}/missing.c"),
            format!("{base}/c.h"),
        ]);

        let err = set.fetch(&dest, "files").unwrap_err();

        assert!(err.to_string().contains("missing.c"), "{err}");
        assert!(dest.join("a.h").is_file());
        assert!(!dest.join("c.h").exists());
    }

    #[test]
    fn fetch_creates_destination_and_fails_fast() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("Middleware/files");
        let set = FileSetSource::new(vec![
            "http://127.0.0.1:9/a.h".to_owned(),
            "http://127.0.0.1:9/b.c".to_owned(),
        ]);

        let err = set.fetch(&dest, "files").unwrap_err();

        assert!(dest.is_dir());
        assert!(err.to_string().contains("127.0.0.1:9/a.h"), "{err}");
    }
}
