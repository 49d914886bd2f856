//! Locating a finished browser download on disk
//!
//! The browser writes into a temporary name (e.g. `report.csv.crdownload`)
//! and renames the file when the transfer completes. The locator watches the
//! newest entry in the download directory until it loses that suffix.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tracing::{debug, info, trace};

use crate::readiness::{WaitCondition, poll_until};
use crate::utils::constants::{
    DEFAULT_DOWNLOAD_MAX_ATTEMPTS, DEFAULT_DOWNLOAD_POLL_INTERVAL_MS, DEFAULT_STAGE_TIMEOUT_SECS,
    PARTIAL_DOWNLOAD_SUFFIXES,
};
use crate::utils::{ScrapeError, ScrapeResult};

/// How far a file's creation stamp may trail the wall clock
///
/// Filesystems stamp files from a coarse kernel clock, so a file created just
/// after `SystemTime::now()` can carry an earlier timestamp.
pub const TIMESTAMP_SLACK: Duration = Duration::from_secs(1);

/// One entry reported by a [`DirectoryLister`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub created: SystemTime,
}

/// Filesystem capability the locator observes the download through
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    async fn list_entries(&self, directory: &Path) -> ScrapeResult<Vec<DirectoryEntry>>;
}

/// Lists the regular files of a directory with `tokio::fs`
///
/// Subdirectories are skipped: a shared download directory such as the system
/// temp dir also holds browser profile directories. Where the platform does
/// not record creation time the modification time stands in.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDirectoryLister;

#[async_trait]
impl DirectoryLister for FsDirectoryLister {
    async fn list_entries(&self, directory: &Path) -> ScrapeResult<Vec<DirectoryEntry>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(directory).await?;
        while let Some(entry) = dir.next_entry().await? {
            // Entries can vanish between listing and stat, e.g. a partial file being renamed
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !metadata.is_file() {
                continue;
            }
            let created = metadata.created().or_else(|_| metadata.modified())?;
            entries.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                created,
            });
        }
        Ok(entries)
    }
}

/// The newest entry of a listing, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadCandidate {
    pub name: String,
    pub created: SystemTime,
    /// Still carries a partial-download suffix
    pub provisional: bool,
}

impl DownloadCandidate {
    fn classify(entry: DirectoryEntry, partial_suffixes: &[String]) -> Self {
        let provisional = partial_suffixes.iter().any(|s| entry.name.ends_with(s.as_str()));
        Self {
            name: entry.name,
            created: entry.created,
            provisional,
        }
    }
}

/// Created no earlier than `since`, give or take [`TIMESTAMP_SLACK`]
fn is_fresh(entry: &DirectoryEntry, since: SystemTime) -> bool {
    let cutoff = since
        .checked_sub(TIMESTAMP_SLACK)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    entry.created >= cutoff
}

async fn has_fresh_entry<L: DirectoryLister>(
    lister: &L,
    directory: &Path,
    since: SystemTime,
) -> ScrapeResult<bool> {
    let entries = lister.list_entries(directory).await?;
    Ok(entries.iter().any(|e| is_fresh(e, since)))
}

/// Newest entry by creation time, ties broken by the greater name
fn newest(entries: impl IntoIterator<Item = DirectoryEntry>) -> Option<DirectoryEntry> {
    entries
        .into_iter()
        .max_by(|a, b| a.created.cmp(&b.created).then_with(|| a.name.cmp(&b.name)))
}

pub struct ArtifactLocator<L: DirectoryLister> {
    lister: L,
    max_attempts: u32,
    interval: Duration,
    start_timeout: Duration,
    partial_suffixes: Vec<String>,
}

impl ArtifactLocator<FsDirectoryLister> {
    pub fn on_disk() -> Self {
        Self::new(FsDirectoryLister)
    }
}

impl<L: DirectoryLister> ArtifactLocator<L> {
    pub fn new(lister: L) -> Self {
        Self {
            lister,
            max_attempts: DEFAULT_DOWNLOAD_MAX_ATTEMPTS,
            interval: Duration::from_millis(DEFAULT_DOWNLOAD_POLL_INTERVAL_MS),
            start_timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
            partial_suffixes: PARTIAL_DOWNLOAD_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    pub fn with_partial_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.partial_suffixes = suffixes;
        self
    }

    /// Wait until `directory` holds an entry created since the download was
    /// triggered at `since`
    ///
    /// The browser creates its file some time after the click; a dedicated
    /// download directory is empty until then. Listing errors end the wait.
    ///
    /// # Errors
    /// * `Timeout` - nothing appeared within the start timeout
    pub async fn wait_for_start(
        &self,
        directory: &Path,
        since: SystemTime,
    ) -> ScrapeResult<Duration> {
        let condition = WaitCondition::new(
            format!("a download to appear in {}", directory.display()),
            self.start_timeout,
            self.interval,
        );
        let lister = &self.lister;
        let started = poll_until(&condition, || has_fresh_entry(lister, directory, since)).await?;
        debug!("Download started after {:?}", started);
        Ok(started)
    }

    /// Wait for the newest entry in `directory` to be a finished file
    pub async fn locate(&self, directory: &Path) -> ScrapeResult<PathBuf> {
        self.locate_since(directory, None).await
    }

    /// Like [`locate`](Self::locate), ignoring entries created before `since`
    ///
    /// Entries stamped up to [`TIMESTAMP_SLACK`] before `since` still count.
    /// A non-empty directory holding only older entries is treated like a
    /// download that has not surfaced yet. An empty directory is never
    /// retried: nothing can appear in it unless a download was triggered.
    ///
    /// # Errors
    /// * `EmptyDirectory` - a listing came back empty
    /// * `DownloadTimeout` - no finished entry within the attempt budget
    pub async fn locate_since(
        &self,
        directory: &Path,
        since: Option<SystemTime>,
    ) -> ScrapeResult<PathBuf> {
        let mut attempts = 0u32;

        loop {
            let entries = self.lister.list_entries(directory).await?;
            if entries.is_empty() {
                return Err(ScrapeError::EmptyDirectory {
                    directory: directory.to_path_buf(),
                });
            }

            let fresh = entries
                .into_iter()
                .filter(|e| since.is_none_or(|since| is_fresh(e, since)));
            let candidate =
                newest(fresh).map(|e| DownloadCandidate::classify(e, &self.partial_suffixes));

            match &candidate {
                Some(c) if !c.provisional => {
                    let path = directory.join(&c.name);
                    info!("Download complete: {}", path.display());
                    return Ok(path);
                }
                Some(c) => trace!("Newest entry '{}' is still being written", c.name),
                None => trace!("No entry newer than the download trigger yet"),
            }

            attempts += 1;
            if attempts > self.max_attempts {
                return Err(ScrapeError::DownloadTimeout {
                    directory: directory.to_path_buf(),
                    attempts,
                    newest: candidate.map(|c| c.name),
                });
            }
            debug!(
                "Waiting for download in {} (attempt {}/{})",
                directory.display(),
                attempts,
                self.max_attempts
            );
            tokio::time::sleep(self.interval).await;
        }
    }
}
