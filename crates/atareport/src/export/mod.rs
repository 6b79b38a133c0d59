//! Report export pipeline.
//!
//! HTML is rendered to `<temp_dir>/<id>.pdf`, packed into
//! `<temp_dir>/<id>.zip`, and the archive is handed out once through
//! [`Exporter::take_archive`]. Every generation gets a fresh UUID so
//! concurrent requests never share files.

pub mod archive;
pub mod renderer;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

pub use archive::write_single_entry_zip;
pub use renderer::{CommandRenderer, PdfRenderer};

/// Download name used when no company name is available.
pub const DEFAULT_DOWNLOAD_NAME: &str = "relatorio";

/// Handle to an archive waiting to be downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedArchive {
    /// Identifier used in the download route.
    pub id: Uuid,
}

/// Renders reports and manages their temporary archives.
#[derive(Debug, Clone)]
pub struct Exporter {
    temp_dir: PathBuf,
    renderer: Arc<dyn PdfRenderer>,
}

impl Exporter {
    /// Create an exporter staging files in `temp_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(temp_dir: impl Into<PathBuf>, renderer: Arc<dyn PdfRenderer>) -> Result<Self> {
        let temp_dir = temp_dir.into();
        std::fs::create_dir_all(&temp_dir).map_err(|source| Error::DirectoryCreate {
            path: temp_dir.clone(),
            source,
        })?;
        Ok(Self { temp_dir, renderer })
    }

    /// Directory holding in-flight PDFs and archives.
    #[must_use]
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    fn pdf_path(&self, id: Uuid) -> PathBuf {
        self.temp_dir.join(format!("{id}.pdf"))
    }

    fn archive_path(&self, id: Uuid) -> PathBuf {
        self.temp_dir.join(format!("{id}.zip"))
    }

    /// Render `html` to PDF and pack it into a downloadable archive.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or archiving fails; partial files are
    /// removed.
    pub async fn generate(&self, html: &str) -> Result<GeneratedArchive> {
        let id = Uuid::new_v4();
        let pdf = self.pdf_path(id);
        let zip = self.archive_path(id);

        let result = self.render_and_pack(html, &pdf, &zip).await;
        remove_quietly(&pdf).await;
        if result.is_err() {
            remove_quietly(&zip).await;
        }
        result?;

        info!("Generated report archive {}", id);
        Ok(GeneratedArchive { id })
    }

    async fn render_and_pack(&self, html: &str, pdf: &Path, zip: &Path) -> Result<()> {
        self.renderer.render(html, pdf).await?;

        let (pdf, zip) = (pdf.to_path_buf(), zip.to_path_buf());
        tokio::task::spawn_blocking(move || write_single_entry_zip(&pdf, &zip))
            .await
            .map_err(|e| Error::internal(format!("archive task failed: {e}")))?
    }

    /// Read a generated archive and delete it.
    ///
    /// `name` is the archive identifier, with or without a `.zip` suffix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArchiveName`] for names that are not archive
    /// identifiers and [`Error::ArchiveNotFound`] when no such archive
    /// exists.
    pub async fn take_archive(&self, name: &str) -> Result<Vec<u8>> {
        let id = parse_archive_name(name)?;
        let path = self.archive_path(id);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::ArchiveNotFound(name.to_string()))
            }
            Err(source) => return Err(Error::StorageRead { path, source }),
        };

        remove_quietly(&path).await;
        debug!("Handed out archive {} ({} bytes)", id, bytes.len());
        Ok(bytes)
    }
}

fn parse_archive_name(name: &str) -> Result<Uuid> {
    let stem = name.strip_suffix(".zip").unwrap_or(name);
    Uuid::parse_str(stem).map_err(|_| Error::InvalidArchiveName(name.to_string()))
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove {}: {}", path.display(), e),
    }
}

fn unsafe_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\s]").expect("Invalid name pattern"))
}

fn whitespace_runs() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("Invalid whitespace pattern"))
}

/// File name stem for a downloaded archive.
///
/// The company name is trimmed, characters other than ASCII letters,
/// digits, `_` and whitespace are dropped, and whitespace runs become `_`.
///
/// ```
/// use atareport::export::safe_download_name;
///
/// assert_eq!(safe_download_name("Acme & Co. Ltda"), "Acme_Co_Ltda");
/// assert_eq!(safe_download_name("  "), "relatorio");
/// ```
#[must_use]
pub fn safe_download_name(empresa: &str) -> String {
    let stripped = unsafe_chars().replace_all(empresa.trim(), "");
    let name = whitespace_runs().replace_all(&stripped, "_").into_owned();
    if name.is_empty() {
        DEFAULT_DOWNLOAD_NAME.to_string()
    } else {
        name
    }
}
