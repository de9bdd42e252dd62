use crate::chado::ChadoClient;
use crate::error::ReportError;
use crate::flatten::{FlatRecord, Flatten};
use crate::reports::Report;
use crate::reports::alleles::{AlleleRecord, collect_alleles};

pub const DMEL_ALLELES_QUERY: &str = "
    SELECT DISTINCT f.feature_id, f.name, f.uniquename
    FROM feature f
    JOIN organism o ON o.organism_id = f.organism_id
    WHERE f.is_obsolete IS FALSE
      AND f.uniquename ~ '^FBal[0-9]{7}$'
      AND o.abbreviation = 'Dmel'
    ORDER BY f.uniquename;";

/// Wrapper selecting the classical column layout for an allele.
struct ClassicalRow<'a>(&'a AlleleRecord);

impl Flatten for ClassicalRow<'_> {
    fn flatten(&self) -> FlatRecord {
        let allele = self.0;
        FlatRecord::builder()
            .text(allele.symbol.clone())
            .text(allele.id.clone())
            .scalar_pair(&allele.gene)
            .pairs(&allele.allele_classes)
            .pairs(&allele.insertions)
            .pairs(&allele.inserted_element_types)
            .pairs(&allele.regulatory_regions)
            .pairs(&allele.encoded_tools)
            .pairs(&allele.tagged_with)
            .pairs(&allele.also_carries)
            .pairs(&allele.descriptions)
            .count(allele.stock_count)
            .list(&allele.stocks)
            .build()
    }
}

/// D. melanogaster alleles that are not transgenic: classical mutations and
/// insertions.
pub struct ClassicalAlleles;

impl Report for ClassicalAlleles {
    fn label(&self) -> &'static str {
        "dmel_classical_and_insertion_allele_descriptions"
    }

    fn title(&self) -> &'static str {
        "FlyBase D. melanogaster classical and insertion allele descriptions report"
    }

    fn columns(&self) -> &'static [&'static str] {
        &[
            "Allele (symbol)",
            "Allele (id)",
            "Gene (symbol)",
            "Gene (id)",
            "Allele Class (term)",
            "Allele Class (id)",
            "Insertion (symbol)",
            "Insertion (id)",
            "Inserted element type (term)",
            "Inserted element type (id)",
            "Regulatory region (symbol)",
            "Regulatory region (id)",
            "Encoded product/allele (symbol)",
            "Encoded product/allele (id)",
            "Tagged with (symbol)",
            "Tagged with (id)",
            "Also carries (symbol)",
            "Also carries (id)",
            "Description (text)",
            "Description (supporting reference)",
            "Stocks (number)",
            "Stock (list)",
        ]
    }

    fn sort_columns(&self) -> &'static [usize] {
        &[1]
    }

    fn build(&self, chado: &mut dyn ChadoClient) -> Result<Vec<FlatRecord>, ReportError> {
        let mut alleles = collect_alleles(chado, DMEL_ALLELES_QUERY)?;
        alleles.retain("exclude transgenic alleles", |allele| !allele.transgenic);
        Ok(alleles
            .values()
            .map(|allele| ClassicalRow(allele).flatten())
            .collect())
    }
}
