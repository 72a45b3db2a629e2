//! Session context: the settings and catalog shared by everything in one run

use crate::catalog::Catalog;
use crate::export::{ExportJob, PageSpec};
use crate::image_loader::{load_directory, LoadOptions, SkippedFile};
use crate::settings::{Settings, SettingsStore, SharedSettings};
use crate::view::ViewStateMachine;
use crate::AppError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Built once at startup and handed to the frame loop and export jobs
pub struct Session {
    store: SettingsStore,
    settings: Arc<SharedSettings>,
    catalog: Arc<Catalog>,
}

impl Session {
    pub fn new(store: SettingsStore, settings: Settings, catalog: Catalog) -> Self {
        Self {
            store,
            settings: Arc::new(SharedSettings::new(settings)),
            catalog: Arc::new(catalog),
        }
    }

    /// Load settings from `store` and images from `dir`.
    ///
    /// Returns the files that were left out alongside the session.
    pub fn open(store: SettingsStore, dir: &Path, options: &LoadOptions) -> Result<(Self, Vec<SkippedFile>), AppError> {
        let settings = store.load();
        let report = load_directory(dir, options)?;
        Ok((Self::new(store, settings, report.catalog), report.skipped))
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    pub fn settings(&self) -> Settings {
        self.settings.snapshot()
    }

    pub fn shared_settings(&self) -> Arc<SharedSettings> {
        Arc::clone(&self.settings)
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// A fresh view over this session's catalog
    pub fn view(&self) -> Result<ViewStateMachine, AppError> {
        ViewStateMachine::new(self.catalog(), self.settings())
    }

    pub fn start_export(&self, path: PathBuf) -> ExportJob {
        ExportJob::spawn(self.catalog(), PageSpec::default(), path)
    }

    /// Persist the current settings record
    pub fn save_settings(&self) -> Result<(), AppError> {
        self.store.save(&self.settings())
    }
}
