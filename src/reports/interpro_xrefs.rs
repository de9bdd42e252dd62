use crate::chado::{ChadoClient, Row};
use crate::error::ReportError;
use crate::flatten::{FlatRecord, LIST_DELIMITER};
use crate::reports::{Report, flat_rows};

pub const INTERPRO_QUERY: &str = "
    SELECT DISTINCT f.uniquename, f.name, dbx.accession, dbx.description
    FROM feature f
    JOIN organism o ON o.organism_id = f.organism_id
    JOIN feature_dbxref fdbx ON fdbx.feature_id = f.feature_id
    JOIN dbxref dbx ON dbx.dbxref_id = fdbx.dbxref_id
    JOIN db ON db.db_id = dbx.db_id
    WHERE f.is_obsolete IS FALSE
      AND f.uniquename ~ '^FBgn[0-9]{7}$'
      AND o.abbreviation = 'Dmel'
      AND fdbx.is_current IS TRUE
      AND db.name = 'INTERPRO'
    ORDER BY f.uniquename, dbx.accession;";

fn xref_row(row: &Row) -> Result<FlatRecord, ReportError> {
    let signature = format!(
        "{}{LIST_DELIMITER}{}",
        row.text(2)?,
        row.opt_text(3)?.unwrap_or_default()
    );
    Ok(FlatRecord::builder()
        .text(row.text(0)?)
        .text(row.opt_text(1)?.unwrap_or_default())
        .text(signature)
        .build())
}

pub struct InterproXrefs;

impl Report for InterproXrefs {
    fn label(&self) -> &'static str {
        "gene_interpro_xrefs"
    }

    fn title(&self) -> &'static str {
        "FlyBase Gene InterPro Signatures Report"
    }

    fn columns(&self) -> &'static [&'static str] {
        &["FBgn_ID", "FBgn_Symbol", "InterPro_Signature"]
    }

    fn sort_columns(&self) -> &'static [usize] {
        &[0, 2]
    }

    fn build(&self, chado: &mut dyn ChadoClient) -> Result<Vec<FlatRecord>, ReportError> {
        flat_rows(chado, "gene InterPro xrefs", INTERPRO_QUERY, xref_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chado::testing::StaticChado;
    use crate::row;

    #[test]
    fn signature_joins_accession_and_description() {
        let mut chado = StaticChado::default().with(
            INTERPRO_QUERY,
            vec![
                row!("FBgn0000490", "dpp", "IPR001839", "TGF-beta, C-terminal"),
                row!("FBgn0000490", "dpp", "IPR015615", Option::<&str>::None),
            ],
        );
        let records = InterproXrefs.build(&mut chado).unwrap();
        assert_eq!(records[0].cell(2), "IPR001839|TGF-beta, C-terminal");
        assert_eq!(records[1].cell(2), "IPR015615|");
    }
}
