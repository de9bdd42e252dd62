use std::fs;
use std::io::{BufWriter, Write};

use camino::Utf8Path;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::domain::ReportFormat;
use crate::error::ReportError;
use crate::flatten::FlatRecord;

pub const DATA_PROVIDER: &str = "FlyBase";
const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %Y";
#[cfg(unix)]
const REPORT_FILE_MODE: u32 = 0o644;

/// Everything written above the data rows.
#[derive(Debug, Clone)]
pub struct ReportMetadata {
    pub title: String,
    pub generated_at: NaiveDateTime,
    pub database: String,
    pub database_release: String,
    pub annotation_release: Option<String>,
    pub notes: Vec<String>,
    pub footer: bool,
}

impl ReportMetadata {
    pub fn timestamp(&self) -> String {
        self.generated_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

pub fn write_report<W: Write>(
    out: W,
    format: ReportFormat,
    metadata: &ReportMetadata,
    columns: &[&str],
    records: &[FlatRecord],
) -> Result<(), ReportError> {
    match format {
        ReportFormat::Tsv => write_tsv(out, metadata, columns, records),
        ReportFormat::Json => write_json(out, metadata, columns, records),
    }
}

fn export_error(err: impl std::fmt::Display) -> ReportError {
    ReportError::Export(err.to_string())
}

/// `##` comment header, a `## `-prefixed column row, tab-separated data and
/// an optional `## Finished` footer.
pub fn write_tsv<W: Write>(
    mut out: W,
    metadata: &ReportMetadata,
    columns: &[&str],
    records: &[FlatRecord],
) -> Result<(), ReportError> {
    writeln!(out, "## {}", metadata.title).map_err(export_error)?;
    writeln!(out, "## Generated: {}", metadata.timestamp()).map_err(export_error)?;
    writeln!(out, "## Using datasource: {}", metadata.database).map_err(export_error)?;
    for note in &metadata.notes {
        writeln!(out, "## Note: {note}").map_err(export_error)?;
    }
    write!(out, "##\n## ").map_err(export_error)?;

    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .terminator(csv::Terminator::Any(b'\n'))
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(&mut out);
        writer.write_record(columns).map_err(export_error)?;
        for record in records {
            writer.write_record(record.cells()).map_err(export_error)?;
        }
        writer.flush().map_err(export_error)?;
    }

    if metadata.footer {
        writeln!(out, "## Finished {}.", metadata.title).map_err(export_error)?;
    }
    out.flush().map_err(export_error)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonMetadata<'a> {
    data_provider: &'static str,
    title: &'a str,
    date_produced: String,
    database: &'a str,
    database_release: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotation_release: Option<&'a str>,
    #[serde(rename = "note", skip_serializing_if = "no_notes")]
    notes: &'a [String],
}

fn no_notes(notes: &&[String]) -> bool {
    notes.is_empty()
}

struct JsonRecord<'a> {
    columns: &'a [&'a str],
    record: &'a FlatRecord,
}

impl Serialize for JsonRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (index, column) in self.columns.iter().enumerate() {
            map.serialize_entry(column, self.record.cell(index))?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(rename = "metaData")]
    meta_data: JsonMetadata<'a>,
    data: Vec<JsonRecord<'a>>,
}

/// `{"metaData": {...}, "data": [...]}`; keys of each data object follow the
/// column order.
pub fn write_json<W: Write>(
    mut out: W,
    metadata: &ReportMetadata,
    columns: &[&str],
    records: &[FlatRecord],
) -> Result<(), ReportError> {
    let report = JsonReport {
        meta_data: JsonMetadata {
            data_provider: DATA_PROVIDER,
            title: &metadata.title,
            date_produced: metadata.timestamp(),
            database: &metadata.database,
            database_release: &metadata.database_release,
            annotation_release: metadata.annotation_release.as_deref(),
            notes: &metadata.notes,
        },
        data: records
            .iter()
            .map(|record| JsonRecord { columns, record })
            .collect(),
    };
    serde_json::to_writer_pretty(&mut out, &report).map_err(export_error)?;
    out.write_all(b"\n").map_err(export_error)?;
    out.flush().map_err(export_error)
}

/// Writes through a temporary file in the destination directory and renames
/// it into place, so readers never see a partial report.
pub fn write_atomic<F>(dest: &Utf8Path, write: F) -> Result<(), ReportError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), ReportError>,
{
    let parent = dest
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| ReportError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".fb-report")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ReportError::Filesystem(err.to_string()))?;
    {
        let mut buffered = BufWriter::new(temp.as_file_mut());
        write(&mut buffered)?;
        buffered
            .flush()
            .map_err(|err| ReportError::Filesystem(err.to_string()))?;
    }
    set_release_permissions(temp.as_file())?;
    temp.persist(dest.as_std_path())
        .map_err(|err| ReportError::Filesystem(err.to_string()))?;
    Ok(())
}

/// Temporary files are created owner-only; release files are world-readable.
#[cfg(unix)]
fn set_release_permissions(file: &fs::File) -> Result<(), ReportError> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(REPORT_FILE_MODE))
        .map_err(|err| ReportError::Filesystem(err.to_string()))
}

#[cfg(not(unix))]
fn set_release_permissions(_file: &fs::File) -> Result<(), ReportError> {
    Ok(())
}
