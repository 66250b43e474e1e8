//! The reconciliation pass.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{FixEntry, FixState, LoopState, LoopStatus, PassOutcome};
use super::tracker::FixTracker;
use crate::archive::{ArchiveKey, LocalInventory};
use crate::config::{ConfigError, PipelineConfig};
use crate::discovery::{
    DistroArtifact, DistroDiscovery, DistroKind, DownloadState, FixDiscovery, FixedVersion,
    FtpDiscovery, RemoteArtifact, SupportSiteVersion, SuppaFtpLister, VersionSource,
    WebSearchDiscovery,
};
use crate::error::{FixsyncError, FixsyncResult};
use crate::events::{PipelineEvent, Reporter};
use crate::staging::{Repackage, Repackager};
use crate::transfer::{http_client, Transfer, TransferClient, TransferProgress, TransferRequest};

/// The collaborators a [`Reconciler`] drives.
pub struct PipelineParts {
    pub version: Box<dyn VersionSource>,
    pub fixes: Box<dyn FixDiscovery>,
    pub distros: Vec<Box<dyn DistroDiscovery>>,
    pub transfer: Box<dyn Transfer>,
    pub repackager: Box<dyn Repackage>,
}

impl PipelineParts {
    /// Network-backed parts built from settings.
    pub fn from_config(config: &PipelineConfig) -> FixsyncResult<Self> {
        let client = http_client(&config.user_agent, config.timeout, Some(config.timeout))?;

        let version: Box<dyn VersionSource> = match &config.target_version {
            Some(v) => Box::new(FixedVersion(v.clone())),
            None => Box::new(SupportSiteVersion::new(
                client.clone(),
                &config.version_page_url,
            )),
        };

        let distros = config
            .distros
            .iter()
            .map(|source| {
                Box::new(FtpDiscovery::new(
                    SuppaFtpLister::new(config.timeout),
                    &source.ftp_url,
                    &config.distro_subdir,
                    source.kind,
                )) as Box<dyn DistroDiscovery>
            })
            .collect();

        Ok(Self {
            version,
            fixes: Box::new(WebSearchDiscovery::new(
                client,
                &config.search_url,
                &config.search_kb,
                &config.fix_prefix,
            )),
            distros,
            transfer: Box::new(TransferClient::from_config(config)?),
            repackager: Box::new(Repackager::from_config(config)),
        })
    }
}

/// Polls discovery sources and brings the local directories up to date.
///
/// At most one pass or manual download run is active at a time; a call
/// made while another is running returns `None` without doing anything.
/// Fix package downloads and each distribution download own separate
/// cancellation tokens.
pub struct Reconciler {
    config: PipelineConfig,
    parts: PipelineParts,
    reporter: Reporter,
    busy: AtomicBool,
    status: Mutex<LoopStatus>,
    tracker: Mutex<FixTracker>,
    distros: Mutex<Vec<DistroArtifact>>,
    fix_cancel: Mutex<Option<CancellationToken>>,
    distro_cancel: Mutex<HashMap<DistroKind, CancellationToken>>,
}

/// Clears the busy flag when a pass ends, however it ends.
struct BusyGuard<'a> {
    reconciler: &'a Reconciler,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.reconciler.status.lock().state = LoopState::Idle;
        self.reconciler.busy.store(false, Ordering::Release);
    }
}

impl Reconciler {
    pub fn new(config: PipelineConfig, parts: PipelineParts, reporter: Reporter) -> Self {
        Self {
            config,
            parts,
            reporter,
            busy: AtomicBool::new(false),
            status: Mutex::new(LoopStatus::default()),
            tracker: Mutex::new(FixTracker::new()),
            distros: Mutex::new(Vec::new()),
            fix_cancel: Mutex::new(None),
            distro_cancel: Mutex::new(HashMap::new()),
        }
    }

    /// Reconciler over the network-backed pipeline.
    pub fn from_config(config: PipelineConfig, reporter: Reporter) -> FixsyncResult<Self> {
        let parts = PipelineParts::from_config(&config)?;
        Ok(Self::new(config, parts, reporter))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn status(&self) -> LoopStatus {
        self.status.lock().clone()
    }

    /// Tracked fix packages in discovery order.
    pub fn fixes(&self) -> Vec<FixEntry> {
        self.tracker.lock().entries().to_vec()
    }

    /// Distribution images from the latest pass.
    pub fn distros(&self) -> Vec<DistroArtifact> {
        self.distros.lock().clone()
    }

    /// Toggle selection of a tracked fix package.
    pub fn set_selected(&self, name: &str, selected: bool) -> bool {
        self.tracker.lock().set_selected(name, selected)
    }

    pub fn select_all(&self, selected: bool) {
        self.tracker.lock().select_all(selected);
    }

    /// Run one reconciliation pass.
    ///
    /// Returns `None` when another pass is already running. Failures are
    /// logged and recorded in [`LoopStatus::last_error`], never returned.
    pub fn run_pass(&self) -> Option<PassOutcome> {
        let Some(_guard) = self.try_enter() else {
            debug!("reconciliation already running, trigger dropped");
            return None;
        };

        self.status.lock().last_error = None;
        let outcome = match self.pass() {
            Ok(outcome) => outcome,
            Err(e) => {
                self.reporter.error(format!("Check failed: {}", e));
                self.status.lock().last_error = Some(e.to_string());
                PassOutcome::default()
            }
        };

        let mut status = self.status.lock();
        status.last_checked = Some(Local::now());
        status.phase = "Idle".to_string();
        Some(outcome)
    }

    /// Download the selected fix packages, then repackage when enabled.
    ///
    /// Returns `None` when a pass is already running.
    pub fn download_selected(&self) -> Option<FixsyncResult<PassOutcome>> {
        let _guard = self.try_enter()?;
        let result = self.download_pending(self.config.auto_sfx);
        self.status.lock().phase = "Idle".to_string();
        Some(result)
    }

    /// Download the distribution image of `kind` found by the last pass.
    ///
    /// Returns `Ok(None)` when nothing was found, the file already exists
    /// or a download of this kind is in flight.
    pub fn download_distro(&self, kind: DistroKind) -> FixsyncResult<Option<PathBuf>> {
        let source = self
            .config
            .distro(kind)
            .ok_or(ConfigError::Missing(kind.url_key()))?;
        let target_dir = source.target_dir.clone();

        let found = self.distros.lock().iter().find(|d| d.kind == kind).cloned();
        let Some(artifact) = found else {
            self.reporter.warn(format!("No {} distribution found", kind));
            return Ok(None);
        };

        if target_dir.join(&artifact.file_name).exists() {
            self.reporter.info(format!(
                "{} distribution {} is already present",
                kind, artifact.file_name
            ));
            return Ok(None);
        }
        fs::create_dir_all(&target_dir).map_err(|e| FixsyncError::Io {
            path: target_dir.clone(),
            source: e,
        })?;

        let token = CancellationToken::new();
        {
            let mut tokens = self.distro_cancel.lock();
            if tokens.contains_key(&kind) {
                self.reporter
                    .warn(format!("{} distribution is already downloading", kind));
                return Ok(None);
            }
            tokens.insert(kind, token.clone());
        }

        self.reporter.info(format!(
            "Downloading {} distribution {} ({})",
            kind, artifact.file_name, artifact.version
        ));
        self.update_distro(kind, DownloadState::Downloading);

        let name = artifact.file_name.clone();
        let progress = |p: TransferProgress| {
            if let Some(d) = self.distros.lock().iter_mut().find(|d| d.kind == kind) {
                d.size_bytes = p.total.or(d.size_bytes);
                d.progress_percent = p.percent().unwrap_or(d.progress_percent);
            }
            self.reporter.emit(PipelineEvent::Transfer {
                name: name.clone(),
                progress: p,
            });
        };
        let result = self.parts.transfer.download(
            &TransferRequest::from(&artifact),
            &target_dir,
            &progress,
            &token,
        );
        self.distro_cancel.lock().remove(&kind);

        match result {
            Ok(path) => {
                self.update_distro(kind, DownloadState::Done);
                self.reporter
                    .info(format!("{} distribution saved to {}", kind, path.display()));
                Ok(Some(path))
            }
            Err(e) => {
                discard_partial(&target_dir, &artifact.file_name);
                let state = if e.is_cancelled() {
                    DownloadState::Cancelled
                } else {
                    DownloadState::Failed
                };
                self.update_distro(kind, state);
                Err(e.into())
            }
        }
    }

    /// Cancel the in-flight fix package downloads; false when none run.
    pub fn cancel_fix_downloads(&self) -> bool {
        match self.fix_cancel.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel the in-flight distribution download of `kind`.
    pub fn cancel_distro_download(&self, kind: DistroKind) -> bool {
        match self.distro_cancel.lock().get(&kind) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every download group.
    pub fn cancel_all(&self) {
        self.cancel_fix_downloads();
        for kind in DistroKind::ALL {
            self.cancel_distro_download(kind);
        }
    }

    /// Record a failure that escaped a pass.
    pub(crate) fn record_failure(&self, message: &str) {
        self.reporter.error(message.to_string());
        let mut status = self.status.lock();
        status.last_error = Some(message.to_string());
        status.last_checked = Some(Local::now());
    }

    fn try_enter(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.status.lock().state = LoopState::Busy;
        Some(BusyGuard { reconciler: self })
    }

    fn set_phase(&self, label: &str) {
        self.status.lock().phase = label.to_string();
        self.reporter.phase(label);
    }

    fn pass(&self) -> FixsyncResult<PassOutcome> {
        let mut outcome = PassOutcome::default();

        self.set_phase("Resolving version");
        let version = match self.parts.version.resolve() {
            Ok(v) => {
                self.reporter.info(format!("Current version: {}", v));
                Some(v)
            }
            Err(e) => {
                self.reporter
                    .error(format!("Could not determine the current version: {}", e));
                self.status.lock().last_error = Some(e.to_string());
                None
            }
        };
        self.status.lock().current_version = version.clone();

        let found: Vec<RemoteArtifact> = match &version {
            Some(v) => {
                self.set_phase("Searching fix packages");
                self.parts.fixes.discover(v, &self.reporter)
            }
            None => Vec::new(),
        };

        self.set_phase("Checking distributions");
        outcome.distros = self.refresh_distros();

        self.set_phase("Comparing with local files");
        let inventory = LocalInventory::scan(&self.config.download_dir).map_err(|e| {
            FixsyncError::Io {
                path: self.config.download_dir.clone(),
                source: e,
            }
        })?;
        let added =
            self.tracker
                .lock()
                .merge_discovered(found, &inventory, self.config.auto_download);
        for name in &added {
            self.reporter.info(format!("New fix package: {}", name));
            self.reporter.emit(PipelineEvent::FixStateChanged {
                name: name.clone(),
                state: FixState::New,
            });
        }
        outcome.new_fixes = added;

        if self.config.auto_download && !outcome.new_fixes.is_empty() {
            self.reporter
                .info("Starting automatic download of new fix packages");
            let run = self.download_pending(self.config.auto_sfx)?;
            outcome.downloaded = run.downloaded;
            outcome.installers = run.installers;
        }

        for source in self.config.distros.iter().filter(|s| s.auto_download) {
            match self.download_distro(source.kind) {
                Ok(Some(path)) => outcome.distro_files.push(path),
                Ok(None) => {}
                Err(e) if e.is_cancelled() => self
                    .reporter
                    .warn(format!("{} distribution download cancelled", source.kind)),
                Err(e) => self.reporter.error(format!(
                    "{} distribution download failed: {}",
                    source.kind, e
                )),
            }
        }

        info!(
            new = outcome.new_fixes.len(),
            downloaded = outcome.downloaded.len(),
            installers = outcome.installers.len(),
            "reconciliation pass complete"
        );
        Ok(outcome)
    }

    /// Replace distro descriptors, keeping any with a download in flight.
    fn refresh_distros(&self) -> Vec<DistroArtifact> {
        let found: Vec<DistroArtifact> = self
            .parts
            .distros
            .iter()
            .filter_map(|d| d.discover(&self.reporter))
            .collect();

        let in_flight: HashSet<DistroKind> = self.distro_cancel.lock().keys().copied().collect();
        let mut current = self.distros.lock();
        let mut next: Vec<DistroArtifact> = current
            .iter()
            .filter(|d| in_flight.contains(&d.kind))
            .cloned()
            .collect();
        next.extend(
            found
                .iter()
                .filter(|d| !in_flight.contains(&d.kind))
                .cloned(),
        );
        *current = next;
        found
    }

    fn download_pending(&self, repackage: bool) -> FixsyncResult<PassOutcome> {
        let pending = self.tracker.lock().pending_selection();
        if pending.is_empty() {
            self.reporter.info("Nothing selected");
            return Ok(PassOutcome::default());
        }

        let dir = &self.config.download_dir;
        fs::create_dir_all(dir).map_err(|e| FixsyncError::Io {
            path: dir.clone(),
            source: e,
        })?;

        self.set_phase("Downloading fix packages");
        let token = CancellationToken::new();
        *self.fix_cancel.lock() = Some(token.clone());
        let downloaded = self.download_fixes(&pending, &token);
        *self.fix_cancel.lock() = None;

        let mut outcome = PassOutcome {
            downloaded,
            ..PassOutcome::default()
        };

        if repackage && !outcome.downloaded.is_empty() {
            self.set_phase("Repackaging");
            let selection: HashSet<ArchiveKey> =
                self.tracker.lock().selected_keys().into_iter().collect();
            match self.parts.repackager.repackage(
                dir,
                Some(&selection),
                &self.config.sfx_output_dir,
                &self.reporter,
            ) {
                Ok(reports) => {
                    for report in &reports {
                        self.reporter.info(format!(
                            "Installer ready: {}",
                            report.installer.path.display()
                        ));
                    }
                    outcome.installers = reports;
                }
                Err(e) => self.reporter.error(format!("Repackaging failed: {}", e)),
            }
        }

        self.reporter.info("All downloads finished");
        Ok(outcome)
    }

    /// Sequential downloads; a cancellation stops the rest of the group.
    fn download_fixes(&self, pending: &[RemoteArtifact], token: &CancellationToken) -> Vec<PathBuf> {
        let mut written = Vec::new();
        for artifact in pending {
            if token.is_cancelled() {
                break;
            }
            let name = artifact.name.clone();
            self.update_fix(&name, FixState::Downloading);
            self.reporter.info(format!("Downloading {}", name));

            let progress = |p: TransferProgress| {
                self.reporter.emit(PipelineEvent::Transfer {
                    name: name.clone(),
                    progress: p,
                });
            };
            match self.parts.transfer.download(
                &TransferRequest::from(artifact),
                &self.config.download_dir,
                &progress,
                token,
            ) {
                Ok(path) => {
                    self.update_fix(&name, FixState::Done);
                    self.reporter.info(format!("Downloaded {}", name));
                    written.push(path);
                }
                Err(e) if e.is_cancelled() => {
                    discard_partial(&self.config.download_dir, &name);
                    self.update_fix(&name, FixState::Cancelled);
                    self.reporter.warn(format!("Download of {} cancelled", name));
                    break;
                }
                Err(e) => {
                    discard_partial(&self.config.download_dir, &name);
                    self.update_fix(&name, FixState::Failed);
                    self.reporter
                        .error(format!("Failed to download {}: {}", name, e));
                }
            }
        }
        written
    }

    fn update_fix(&self, name: &str, state: FixState) {
        self.tracker.lock().set_state(name, state);
        self.reporter.emit(PipelineEvent::FixStateChanged {
            name: name.to_string(),
            state,
        });
    }

    fn update_distro(&self, kind: DistroKind, state: DownloadState) {
        let moved = self
            .distros
            .lock()
            .iter_mut()
            .find(|d| d.kind == kind)
            .filter(|d| d.state.can_advance_to(state))
            .map(|d| {
                d.advance(state);
                d.file_name.clone()
            });
        if let Some(file_name) = moved {
            self.reporter.emit(PipelineEvent::DistroStateChanged {
                kind,
                file_name,
                state,
            });
        }
    }
}

/// Remove what an interrupted transfer left behind so the next inventory
/// scan does not count it as downloaded.
fn discard_partial(dir: &Path, file_name: &str) {
    let path = dir.join(file_name);
    if !path.is_file() {
        return;
    }
    match fs::remove_file(&path) {
        Ok(()) => debug!(path = %path.display(), "removed partial download"),
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial download"),
    }
}
