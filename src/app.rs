use std::io::Write;

use camino::Utf8PathBuf;
use chrono::{Local, NaiveDateTime};
use tracing::info;

use crate::chado::ChadoClient;
use crate::config::ResolvedConfig;
use crate::domain::ReportFormat;
use crate::error::ReportError;
use crate::export::{ReportMetadata, write_atomic, write_report};
use crate::flatten::{FlatRecord, sort_records};
use crate::reports::Report;

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub report: &'static str,
    pub format: ReportFormat,
    pub path: Utf8PathBuf,
    pub records: usize,
}

pub struct App<C: ChadoClient> {
    chado: C,
    config: ResolvedConfig,
}

impl<C: ChadoClient> App<C> {
    pub fn new(chado: C, config: ResolvedConfig) -> Self {
        Self { chado, config }
    }

    /// Hands the client back so the caller can close it.
    pub fn into_client(self) -> C {
        self.chado
    }

    pub fn metadata(&self, report: &dyn Report, generated_at: NaiveDateTime) -> ReportMetadata {
        ReportMetadata {
            title: report.title().to_string(),
            generated_at,
            database: self.config.database().to_string(),
            database_release: self.config.database_release.clone(),
            annotation_release: self.config.annotation_release.clone(),
            notes: report.notes(),
            footer: report.footer(),
        }
    }

    /// Builds the report rows in export order.
    pub fn records(&mut self, report: &dyn Report) -> Result<Vec<FlatRecord>, ReportError> {
        let mut records = report.build(&mut self.chado)?;
        let width = report.columns().len();
        if let Some(record) = records.iter().find(|record| record.len() != width) {
            return Err(ReportError::Export(format!(
                "{} produced a row with {} cells for {width} columns",
                report.label(),
                record.len()
            )));
        }
        sort_records(&mut records, report.sort_columns());
        Ok(records)
    }

    pub fn render(
        &mut self,
        report: &dyn Report,
        format: ReportFormat,
        generated_at: NaiveDateTime,
        out: &mut dyn Write,
    ) -> Result<usize, ReportError> {
        let records = self.records(report)?;
        let metadata = self.metadata(report, generated_at);
        write_report(out, format, &metadata, report.columns(), &records)?;
        Ok(records.len())
    }

    /// Writes `{output_dir}/{label}_{database}.{ext}`, replacing any previous
    /// file only once the new one is complete.
    pub fn run(
        &mut self,
        report: &dyn Report,
        format: ReportFormat,
    ) -> Result<ExportSummary, ReportError> {
        let path = self.config.output_path(report.label(), format);
        info!(report = report.label(), %format, path = %path, "building report");
        let generated_at = Local::now().naive_local();
        let mut records = 0;
        write_atomic(&path, |out| {
            records = self.render(report, format, generated_at, out)?;
            Ok(())
        })?;
        info!(report = report.label(), records, path = %path, "report written");
        Ok(ExportSummary {
            report: report.label(),
            format,
            path,
            records,
        })
    }
}
