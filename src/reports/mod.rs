//! The bulk reports. Registry-backed reports run driving query, enrichers,
//! post-processing and flattening; flat reports map each result row to one
//! export row.

pub mod alleles;
pub mod best_gene_summary;
pub mod chem_synonyms;
pub mod classical_alleles;
pub mod enzyme_gene_groups;
pub mod gene_so_annotations;
pub mod interpro_xrefs;
pub mod organisms;
pub mod paralogs;
pub mod transgenic_alleles;

use tracing::info;

use crate::chado::{ChadoClient, Row};
use crate::error::ReportError;
use crate::flatten::FlatRecord;

pub use best_gene_summary::BestGeneSummary;
pub use chem_synonyms::ChemSynonyms;
pub use classical_alleles::ClassicalAlleles;
pub use enzyme_gene_groups::EnzymeGeneGroups;
pub use gene_so_annotations::GeneSoAnnotations;
pub use interpro_xrefs::InterproXrefs;
pub use organisms::Organisms;
pub use paralogs::Paralogs;
pub use transgenic_alleles::TransgenicAlleles;

pub trait Report {
    /// File stem for the output and log files.
    fn label(&self) -> &'static str;

    fn title(&self) -> &'static str;

    /// Export columns, in order. Every record `build` returns has one cell
    /// per column.
    fn columns(&self) -> &'static [&'static str];

    fn notes(&self) -> Vec<String> {
        Vec::new()
    }

    fn footer(&self) -> bool {
        true
    }

    /// Column indexes the exported rows are ordered by.
    fn sort_columns(&self) -> &'static [usize] {
        &[0]
    }

    fn build(&self, chado: &mut dyn ChadoClient) -> Result<Vec<FlatRecord>, ReportError>;
}

/// Runs a single query and maps every row to a record.
pub(crate) fn flat_rows<F>(
    chado: &mut dyn ChadoClient,
    what: &str,
    sql: &str,
    map: F,
) -> Result<Vec<FlatRecord>, ReportError>
where
    F: Fn(&Row) -> Result<FlatRecord, ReportError>,
{
    let rows = chado.query(sql)?;
    info!(rows = rows.len(), "found {what}");
    rows.iter().map(map).collect()
}

/// `(name, uniquename)` or `(term, curie)` from columns 1 and 2. Feature
/// names are nullable in chado.
pub(crate) fn name_and_id(row: &Row) -> Result<(String, String), ReportError> {
    Ok((
        row.opt_text(1)?.unwrap_or_default().to_string(),
        row.text(2)?.to_string(),
    ))
}
