use camino::Utf8Path;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::domain::{MissingArchivePolicy, ModelFilter};
use crate::error::M4dbError;
use crate::export::ModelTable;
use crate::store::{self, DestinationTree, SourceTree};

#[derive(Debug, Clone, Copy, Default)]
pub struct RetrieveOptions {
    pub on_missing_archive: MissingArchivePolicy,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrieveResult {
    pub matched: usize,
    pub retrieved: usize,
    pub skipped: Vec<String>,
    pub dry_run: bool,
    pub finished_at: String,
    pub items: Vec<RetrievedItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievedItem {
    pub unique_id: String,
    pub source_path: String,
    pub output_path: String,
    pub bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub rows: usize,
    pub output_path: String,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountResult {
    pub table: String,
    pub rows: u64,
}

#[derive(Debug, Clone, Copy)]
pub enum ProgressSinkKind {
    Retrieve,
    Export,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    /// `(completed, total)` records, set once per processed record.
    pub position: Option<(usize, usize)>,
}

impl ProgressEvent {
    fn phase(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<C: Catalog> {
    catalog: C,
    source: SourceTree,
}

impl<C: Catalog> App<C> {
    pub fn new(catalog: C, source: SourceTree) -> Self {
        Self { catalog, source }
    }

    pub fn retrieve(
        &self,
        filter: &ModelFilter,
        destination: &Utf8Path,
        options: RetrieveOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RetrieveResult, M4dbError> {
        tracing::info!(
            db_user = %filter.db_user,
            project = %filter.project_name,
            destination = %destination,
            policy = %options.on_missing_archive,
            dry_run = options.dry_run,
            "retrieving models"
        );
        let records = self.catalog.fetch_models(filter)?;
        let total = records.len();
        sink.event(ProgressEvent::phase(format!(
            "phase=Resolve; retrieved {total} models"
        )));

        let tree = DestinationTree::new(destination);
        let mut items = Vec::with_capacity(total);
        let mut skipped = Vec::new();

        for (index, record) in records.iter().enumerate() {
            let source_path = self.source.archive_path(&record.unique_id)?;
            let output_path = tree.archive_path(record)?;
            tracing::debug!(
                uid = %record.unique_id,
                source = %source_path,
                output = %output_path,
                "copying archive"
            );

            let copied = if options.dry_run {
                if source_path.as_std_path().is_file() {
                    Ok(None)
                } else {
                    Err(M4dbError::SourceArchiveMissing {
                        uid: record.unique_id.clone(),
                        path: source_path.to_string(),
                    })
                }
            } else {
                store::copy_archive(&record.unique_id, &source_path, &output_path).map(Some)
            };

            match copied {
                Ok(bytes) => items.push(RetrievedItem {
                    unique_id: record.unique_id.clone(),
                    source_path: source_path.to_string(),
                    output_path: output_path.to_string(),
                    bytes,
                }),
                Err(M4dbError::SourceArchiveMissing { uid, path })
                    if options.on_missing_archive == MissingArchivePolicy::Skip =>
                {
                    tracing::warn!(uid = %uid, path = %path, "archive missing, skipping model");
                    skipped.push(uid);
                }
                Err(err) => return Err(err),
            }

            sink.event(ProgressEvent {
                message: format!("phase=Store; {}", record.unique_id),
                position: Some((index + 1, total)),
            });
        }

        tracing::info!(
            retrieved = items.len(),
            skipped = skipped.len(),
            "retrieval finished"
        );
        Ok(RetrieveResult {
            matched: total,
            retrieved: items.len(),
            skipped,
            dry_run: options.dry_run,
            finished_at: now_rfc3339(),
            items,
        })
    }

    pub fn export(
        &self,
        filter: &ModelFilter,
        output_path: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<ExportResult, M4dbError> {
        tracing::info!(
            db_user = %filter.db_user,
            project = %filter.project_name,
            output = %output_path,
            "exporting model statistics"
        );
        let records = self.catalog.fetch_models(filter)?;
        let total = records.len();
        sink.event(ProgressEvent::phase(format!(
            "phase=Resolve; retrieved {total} models"
        )));

        let table = ModelTable::from_records(&records);
        if table.is_empty() {
            tracing::warn!("no models matched, writing header only");
        }
        sink.event(ProgressEvent {
            message: format!("phase=Store; writing {output_path}"),
            position: Some((total, total)),
        });
        table.write_csv(output_path)?;

        Ok(ExportResult {
            rows: table.len(),
            output_path: output_path.to_string(),
            finished_at: now_rfc3339(),
        })
    }

    pub fn count_rows(&self, table: &str) -> Result<CountResult, M4dbError> {
        let rows = self.catalog.count_rows(table)?;
        tracing::info!(table, rows, "counted rows");
        Ok(CountResult {
            table: table.to_string(),
            rows,
        })
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
