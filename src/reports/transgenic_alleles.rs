use crate::chado::ChadoClient;
use crate::error::ReportError;
use crate::flatten::{FlatRecord, Flatten};
use crate::registry::MultiValued;
use crate::reports::Report;
use crate::reports::alleles::{AlleleRecord, collect_alleles};

pub const ALLELES_QUERY: &str = "
    SELECT DISTINCT f.feature_id, f.name, f.uniquename
    FROM feature f
    WHERE f.is_obsolete IS FALSE
      AND f.uniquename ~ '^FBal[0-9]{7}$'
    ORDER BY f.uniquename;";

struct TransgenicRow<'a>(&'a AlleleRecord);

impl Flatten for TransgenicRow<'_> {
    fn flatten(&self) -> FlatRecord {
        let allele = self.0;
        let encoded = encoded_or_gene(allele);
        FlatRecord::builder()
            .text(allele.symbol.clone())
            .text(allele.id.clone())
            .pairs(&allele.constructs)
            .pairs(&allele.product_classes)
            .pairs(&allele.regulatory_regions)
            .pairs(&encoded)
            .pairs(&allele.tagged_with)
            .pairs(&allele.also_carries)
            .pairs(&allele.descriptions)
            .count(allele.stock_count)
            .build()
    }
}

/// Alleles carried by transgenic constructs or made in vitro.
pub struct TransgenicAlleles;

impl Report for TransgenicAlleles {
    fn label(&self) -> &'static str {
        "transgenic_construct_descriptions"
    }

    fn title(&self) -> &'static str {
        "FlyBase D. melanogaster transgenic construct descriptions report"
    }

    fn columns(&self) -> &'static [&'static str] {
        &[
            "Component Allele (symbol)",
            "Component Allele (id)",
            "Transgenic Construct (symbol)",
            "Transgenic Construct (id)",
            "Transgenic Product class (term)",
            "Transgenic Product class (id)",
            "Regulatory region (symbol)",
            "Regulatory region (id)",
            "Encoded product/tool (symbol)",
            "Encoded product/tool (id)",
            "Tagged with (symbol)",
            "Tagged with (id)",
            "Also carries (symbol)",
            "Also carries (id)",
            "Description (text)",
            "Description (supporting reference)",
            "Stocks (number)",
        ]
    }

    fn sort_columns(&self) -> &'static [usize] {
        &[1]
    }

    fn build(&self, chado: &mut dyn ChadoClient) -> Result<Vec<FlatRecord>, ReportError> {
        let mut alleles = collect_alleles(chado, ALLELES_QUERY)?;
        alleles.retain("keep transgenic alleles", |allele| allele.transgenic);
        Ok(alleles
            .values()
            .map(|allele| TransgenicRow(allele).flatten())
            .collect())
    }
}

/// Without an encoded product or tool, the parental gene is reported as the
/// product.
fn encoded_or_gene(allele: &AlleleRecord) -> MultiValued<(String, String)> {
    if allele.encoded_tools.is_empty() {
        allele.gene.get().cloned().into_iter().collect()
    } else {
        allele.encoded_tools.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chado::testing::StaticChado;
    use crate::reports::alleles::{CONSTRUCTS_QUERY, Component, GENES_QUERY, IN_VITRO_QUERY};
    use crate::row;

    #[test]
    fn keeps_transgenic_and_falls_back_to_gene_product() {
        let mut chado = StaticChado::default()
            .with(
                ALLELES_QUERY,
                vec![
                    row!(1, "w[1118]", "FBal0018186"),
                    row!(2, "Scer\\GAL4[Act5C.PP]", "FBal0000001"),
                    row!(3, "hid[IVC]", "FBal0000002"),
                ],
            )
            .with(CONSTRUCTS_QUERY, vec![row!(2, "P{Act5C-GAL4}", "FBtp0000352")])
            .with(IN_VITRO_QUERY, vec![row!(3)])
            .with(
                GENES_QUERY,
                vec![row!(2, "Scer\\GAL4", "FBgn0014445"), row!(3, "hid", "FBgn0003997")],
            )
            .with(
                &Component::EncodedTool.query(),
                vec![row!(3, "hid[IVC]-tool", "FBto0000001")],
            );

        let records = TransgenicAlleles.build(&mut chado).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].len(), TransgenicAlleles.columns().len());

        assert_eq!(records[0].cell(1), "FBal0000001");
        assert_eq!(records[0].cell(3), "FBtp0000352");
        assert_eq!(records[0].cell(8), "Scer\\GAL4");
        assert_eq!(records[0].cell(9), "FBgn0014445");

        assert_eq!(records[1].cell(1), "FBal0000002");
        assert_eq!(records[1].cell(3), "");
        assert_eq!(records[1].cell(9), "FBto0000001");
    }
}
