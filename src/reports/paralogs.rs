use crate::chado::{ChadoClient, Row};
use crate::error::ReportError;
use crate::flatten::FlatRecord;
use crate::reports::{Report, flat_rows};

/// The DIOPT score is the number of methods listed in the relationship
/// value, counted by the database.
pub const PARALOGS_QUERY: &str = "
    SELECT f1.uniquename, f1.name, src1.uniquename, (fl1.fmin + 1)||'..'||fl1.fmax, fl1.strand,
           f2.uniquename, f2.name, src2.uniquename, (fl2.fmin + 1)||'..'||fl2.fmax, fl2.strand,
           COALESCE(cardinality(array_remove(string_to_array(fr.value, ','), '')), 0)::bigint
    FROM feature f1
    JOIN feature_relationship fr ON fr.subject_id = f1.feature_id
    JOIN feature_relationshipprop frp ON frp.feature_relationship_id = fr.feature_relationship_id
    JOIN cvterm cvtfr ON cvtfr.cvterm_id = fr.type_id
    JOIN organism o1 ON o1.organism_id = f1.organism_id
    JOIN featureloc fl1 ON fl1.feature_id = f1.feature_id
    JOIN feature src1 ON src1.feature_id = fl1.srcfeature_id
    JOIN cvterm srct1 ON srct1.cvterm_id = src1.type_id
    JOIN feature f2 ON f2.feature_id = fr.object_id
    JOIN organism o2 ON o2.organism_id = f2.organism_id
    JOIN featureloc fl2 ON fl2.feature_id = f2.feature_id
    JOIN feature src2 ON src2.feature_id = fl2.srcfeature_id
    JOIN cvterm srct2 ON srct2.cvterm_id = src2.type_id
    WHERE f1.is_obsolete = false AND f1.uniquename ~ '^FBgn[0-9]{7}$' AND o1.abbreviation = 'Dmel'
      AND f2.is_obsolete = false AND f2.uniquename ~ '^FBgn[0-9]{7}$' AND o2.abbreviation = 'Dmel'
      AND cvtfr.name = 'paralogous_to' AND frp.value = 'DIOPT'
      AND src1.is_obsolete = false AND src1.organism_id = f1.organism_id
      AND srct1.name = 'golden_path_region'
      AND src2.is_obsolete = false AND src2.organism_id = f2.organism_id
      AND srct2.name = 'golden_path_region';";

fn paralog_row(row: &Row) -> Result<FlatRecord, ReportError> {
    let mut builder = FlatRecord::builder();
    for index in 0..10 {
        builder = builder.text(row.display(index)?);
    }
    let score = row.int(10)?;
    Ok(builder.text(score.to_string()).build())
}

pub struct Paralogs;

impl Report for Paralogs {
    fn label(&self) -> &'static str {
        "dmel_paralogs"
    }

    fn title(&self) -> &'static str {
        "FlyBase DIOPT Drosophila melanogaster paralog report"
    }

    fn columns(&self) -> &'static [&'static str] {
        &[
            "FBgn_ID",
            "GeneSymbol",
            "Arm/Scaffold",
            "Location",
            "Strand",
            "Paralog_FBgn_ID",
            "Paralog_GeneSymbol",
            "Paralog_Arm/Scaffold",
            "Paralog_Location",
            "Paralog_Strand",
            "DIOPT_score",
        ]
    }

    fn sort_columns(&self) -> &'static [usize] {
        &[0, 5]
    }

    fn build(&self, chado: &mut dyn ChadoClient) -> Result<Vec<FlatRecord>, ReportError> {
        flat_rows(chado, "DIOPT paralog pairs", PARALOGS_QUERY, paralog_row)
    }
}
