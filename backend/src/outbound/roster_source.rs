//! [`RosterSource`] adapter routing each read to the CSV reader or the CMS API.

use async_trait::async_trait;

use super::cms::CmsHttpSource;
use super::csv_export::CsvExportReader;
use crate::domain::EntityKind;
use crate::domain::ports::{RosterSource, RosterSourceError, SourceLocation};
use crate::domain::source_rows::SourceBatch;
use crate::settings::{SettingsError, SyncSettings};

/// Reads CSV exports from disk and everything else from the CMS API.
pub struct ExportRosterSource {
    csv: CsvExportReader,
    cms: Option<CmsHttpSource>,
}

impl ExportRosterSource {
    /// `cms` is `None` when no API base URL is configured; API reads then
    /// fail as unavailable.
    pub fn new(csv: CsvExportReader, cms: Option<CmsHttpSource>) -> Self {
        Self { csv, cms }
    }

    /// Build both readers from loaded settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the CMS URL or default organization is
    /// malformed, or the CMS client cannot be built.
    pub fn from_settings(settings: &SyncSettings) -> Result<Self, SettingsError> {
        let options = settings.normalise_options()?;
        let cms = settings
            .cms_base_url()?
            .map(|base_url| {
                CmsHttpSource::new(
                    base_url,
                    settings.cms_page_size(),
                    settings.cms_timeout(),
                    options.clone(),
                )
                .map_err(|error| SettingsError::Invalid {
                    name: "cms_base_url",
                    message: error.to_string(),
                })
            })
            .transpose()?;
        Ok(Self::new(CsvExportReader::new(options), cms))
    }
}

#[async_trait]
impl RosterSource for ExportRosterSource {
    async fn read(
        &self,
        kind: EntityKind,
        location: &SourceLocation,
    ) -> Result<SourceBatch, RosterSourceError> {
        match location {
            SourceLocation::Csv(path) => {
                let reader = self.csv.clone();
                let path = path.clone();
                tokio::task::spawn_blocking(move || reader.read(kind, &path))
                    .await
                    .map_err(|error| {
                        RosterSourceError::unavailable(format!("CSV reader task failed: {error}"))
                    })?
            }
            SourceLocation::Cms => match &self.cms {
                Some(cms) => cms.fetch(kind).await,
                None => Err(RosterSourceError::unavailable(
                    "no CSV path given and no CMS API configured",
                )),
            },
        }
    }
}
