use crate::chado::{ChadoClient, Row};
use crate::error::ReportError;
use crate::flatten::FlatRecord;
use crate::reports::{Report, flat_rows};

/// Non-current synonyms attributed to research papers.
pub const CHEM_SYNONYMS_QUERY: &str = "
    SELECT DISTINCT f.uniquename, f.name, p.uniquename, s.name
    FROM feature f
    JOIN feature_synonym fs ON fs.feature_id = f.feature_id
    JOIN synonym s ON s.synonym_id = fs.synonym_id
    JOIN pub p ON p.pub_id = fs.pub_id
    JOIN cvterm cvt ON cvt.cvterm_id = p.type_id
    WHERE f.is_obsolete IS FALSE
      AND f.uniquename ~ '^FBch[0-9]{7}$'
      AND fs.is_current IS FALSE
      AND p.is_obsolete IS FALSE
      AND p.uniquename ~ '^FBrf[0-9]{7}$'
      AND cvt.name != 'database';";

fn synonym_row(row: &Row) -> Result<FlatRecord, ReportError> {
    Ok(FlatRecord::builder()
        .text(row.text(2)?)
        .text(row.text(0)?)
        .text(row.opt_text(1)?.unwrap_or_default())
        .text(row.text(3)?)
        .build())
}

pub struct ChemSynonyms;

impl Report for ChemSynonyms {
    fn label(&self) -> &'static str {
        "chem_synonyms"
    }

    fn title(&self) -> &'static str {
        "FlyBase Chemical Synonyms Report"
    }

    fn columns(&self) -> &'static [&'static str] {
        &[
            "Publication_ID",
            "FB_Chemical_ID",
            "FB_Chemical_Name",
            "Author Synonym",
        ]
    }

    fn sort_columns(&self) -> &'static [usize] {
        &[1, 0, 3]
    }

    fn build(&self, chado: &mut dyn ChadoClient) -> Result<Vec<FlatRecord>, ReportError> {
        flat_rows(chado, "chemical synonyms", CHEM_SYNONYMS_QUERY, synonym_row)
    }
}
