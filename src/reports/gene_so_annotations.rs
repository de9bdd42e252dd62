use crate::chado::{ChadoClient, Row};
use crate::error::ReportError;
use crate::flatten::FlatRecord;
use crate::reports::{Report, flat_rows};
use crate::text::{Encoding, convert};

pub const GENE_SO_QUERY: &str = "
    SELECT DISTINCT f.uniquename, s.name, cvt.name, db.name||':'||dbx.accession
    FROM feature f
    JOIN featureloc fl ON fl.feature_id = f.feature_id
    JOIN feature_synonym fs ON fs.feature_id = f.feature_id
    JOIN synonym s ON s.synonym_id = fs.synonym_id
    JOIN cvterm cvts ON cvts.cvterm_id = s.type_id
    JOIN feature_cvterm fcvt ON fcvt.feature_id = f.feature_id
    JOIN cvterm cvt ON cvt.cvterm_id = fcvt.cvterm_id
    JOIN cv ON cv.cv_id = cvt.cv_id
    JOIN dbxref dbx ON dbx.dbxref_id = cvt.dbxref_id
    JOIN db ON db.db_id = dbx.db_id
    WHERE f.is_obsolete = false
      AND f.is_analysis = false
      AND f.uniquename ~ '^FBgn[0-9]{7}$'
      AND fs.is_current = true
      AND fs.is_internal = false
      AND cvts.name = 'symbol'
      AND cv.name = 'SO'
      AND db.name = 'SO'
      AND cvt.name ~ 'gene';";

fn annotation_row(row: &Row) -> Result<FlatRecord, ReportError> {
    Ok(FlatRecord::builder()
        .text(row.text(0)?)
        .text(convert(row.text(1)?, Encoding::ChadoSgml, Encoding::Plain))
        .text(row.text(2)?)
        .text(row.text(3)?)
        .build())
}

/// SO gene-type terms for localized genes.
pub struct GeneSoAnnotations;

impl Report for GeneSoAnnotations {
    fn label(&self) -> &'static str {
        "dmel_gene_sequence_ontology_annotations"
    }

    fn title(&self) -> &'static str {
        "FlyBase Sequence Ontology annotations for localized D. melanogaster genes"
    }

    fn columns(&self) -> &'static [&'static str] {
        &["gene_primary_id", "gene_symbol", "so_term_name", "so_term_id"]
    }

    fn sort_columns(&self) -> &'static [usize] {
        &[0, 3]
    }

    fn build(&self, chado: &mut dyn ChadoClient) -> Result<Vec<FlatRecord>, ReportError> {
        flat_rows(chado, "gene SO annotations", GENE_SO_QUERY, annotation_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chado::testing::StaticChado;
    use crate::row;

    #[test]
    fn symbols_are_plain_text() {
        let mut chado = StaticChado::default().with(
            GENE_SO_QUERY,
            vec![row!("FBgn0003655", "su(w<up>a</up>)", "protein_coding_gene", "SO:0001217")],
        );
        let records = GeneSoAnnotations.build(&mut chado).unwrap();
        assert_eq!(
            records[0].cells(),
            ["FBgn0003655", "su(w[a])", "protein_coding_gene", "SO:0001217"]
        );
    }
}
