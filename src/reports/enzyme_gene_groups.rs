//! Enzyme gene groups and their member genes, with the GO molecular function
//! terms and EC numbers attached to each.

use std::collections::BTreeMap;

use tracing::info;

use crate::chado::{ChadoClient, Row};
use crate::error::ReportError;
use crate::flatten::FlatRecord;
use crate::registry::{Applied, EnrichmentStats, Entity, EntityRegistry, MultiValued, Scalar};
use crate::reports::Report;

/// Component groups of the ENZ parent group, with their full names.
pub const GROUPS_QUERY: &str = "
    SELECT DISTINCT s.uniquename, title.name
    FROM grp s
    JOIN grp_synonym gs ON gs.grp_id = s.grp_id AND gs.is_current IS TRUE
    JOIN synonym title ON title.synonym_id = gs.synonym_id
    JOIN cvterm cvts ON cvts.cvterm_id = title.type_id AND cvts.name = 'fullname'
    JOIN grp_relationship gr ON gr.subject_id = s.grp_id
    JOIN grp o ON o.grp_id = gr.object_id
    JOIN cvterm cvt ON cvt.cvterm_id = gr.type_id
    WHERE s.is_obsolete IS FALSE
      AND cvt.name = 'component_grp'
      AND o.uniquename = 'FBgg0001715'
      AND o.name = 'ENZ';";

pub const MEMBERS_QUERY: &str = "
    SELECT DISTINCT s.uniquename, f.uniquename
    FROM grp s
    JOIN grp_relationship gr ON gr.subject_id = s.grp_id
    JOIN grp o ON o.grp_id = gr.object_id
    JOIN cvterm cvt ON cvt.cvterm_id = gr.type_id
    JOIN grpmember gm ON gm.grp_id = s.grp_id
    JOIN feature_grpmember fgm ON fgm.grpmember_id = gm.grpmember_id
    JOIN feature f ON f.feature_id = fgm.feature_id
    LEFT OUTER JOIN grpmemberprop gmp ON gmp.grpmember_id = gm.grpmember_id
    WHERE s.is_obsolete IS FALSE
      AND f.is_obsolete IS FALSE
      AND f.uniquename ~ '^FBgn[0-9]{7}$'
      AND cvt.name = 'component_grp'
      AND o.uniquename = 'FBgg0001715'
      AND gmp.value IS NULL;";

/// Member genes of enzyme groups with their current symbols.
pub const GENES_QUERY: &str = "
    SELECT DISTINCT f.uniquename, s.name
    FROM grp o
    JOIN grp_relationship gr ON gr.object_id = o.grp_id
    JOIN cvterm cvt ON cvt.cvterm_id = gr.type_id
    JOIN grpmember gm ON gm.grp_id = gr.subject_id
    JOIN feature_grpmember fgm ON fgm.grpmember_id = gm.grpmember_id
    JOIN feature f ON f.feature_id = fgm.feature_id
    JOIN feature_synonym fs ON fs.feature_id = f.feature_id AND fs.is_current IS TRUE
    JOIN synonym s ON s.synonym_id = fs.synonym_id
    JOIN cvterm cvts ON cvts.cvterm_id = s.type_id AND cvts.name = 'symbol'
    WHERE f.is_obsolete IS FALSE
      AND f.uniquename ~ '^FBgn[0-9]{7}$'
      AND cvt.name = 'component_grp'
      AND o.uniquename = 'FBgg0001715';";

pub const FULLNAMES_QUERY: &str = "
    SELECT DISTINCT f.uniquename, s.name
    FROM feature f
    JOIN feature_synonym fs ON fs.feature_id = f.feature_id AND fs.is_current IS TRUE
    JOIN synonym s ON s.synonym_id = fs.synonym_id
    JOIN cvterm cvt ON cvt.cvterm_id = s.type_id AND cvt.name = 'fullname'
    WHERE f.uniquename ~ '^FBgn[0-9]{7}$';";

pub const GROUP_GO_MF_QUERY: &str = "
    SELECT DISTINCT grp.uniquename, cvt.cvterm_id
    FROM grp
    JOIN grp_cvterm gcvt ON gcvt.grp_id = grp.grp_id
    JOIN cvterm cvt ON cvt.cvterm_id = gcvt.cvterm_id
    JOIN cv ON cv.cv_id = cvt.cv_id AND cv.name = 'molecular_function'
    WHERE grp.is_obsolete IS FALSE
      AND gcvt.is_not IS FALSE
      AND cvt.is_obsolete = 0;";

pub const GENE_GO_MF_QUERY: &str = "
    SELECT DISTINCT g.uniquename, cvt.cvterm_id
    FROM feature g
    JOIN feature_cvterm fcvt ON fcvt.feature_id = g.feature_id
    JOIN cvterm cvt ON cvt.cvterm_id = fcvt.cvterm_id
    JOIN cv ON cv.cv_id = cvt.cv_id AND cv.name = 'molecular_function'
    WHERE g.is_obsolete IS FALSE
      AND g.uniquename ~ '^FBgn[0-9]{7}$'
      AND fcvt.is_not IS FALSE
      AND cvt.is_obsolete = 0;";

pub const NEGATED_GENE_GO_MF_QUERY: &str = "
    SELECT DISTINCT g.uniquename, cvt.cvterm_id
    FROM feature g
    JOIN feature_cvterm fcvt ON fcvt.feature_id = g.feature_id
    JOIN cvterm cvt ON cvt.cvterm_id = fcvt.cvterm_id
    JOIN cv ON cv.cv_id = cvt.cv_id AND cv.name = 'molecular_function'
    WHERE g.is_obsolete IS FALSE
      AND g.uniquename ~ '^FBgn[0-9]{7}$'
      AND fcvt.is_not IS TRUE
      AND cvt.is_obsolete = 0;";

pub const GO_MF_TERMS_QUERY: &str = "
    SELECT DISTINCT cvt.cvterm_id, db.name||':'||dbx.accession, cvt.name
    FROM cvterm cvt
    JOIN cv ON cv.cv_id = cvt.cv_id
    JOIN dbxref dbx ON dbx.dbxref_id = cvt.dbxref_id
    JOIN db ON db.db_id = dbx.db_id
    WHERE cvt.is_obsolete = 0
      AND cv.name = 'molecular_function'
      AND db.name = 'GO';";

pub const GO_EC_QUERY: &str = "
    SELECT DISTINCT cvt.cvterm_id, dbx.accession, dbxp.value
    FROM cvterm cvt
    JOIN cv ON cv.cv_id = cvt.cv_id
    JOIN cvterm_dbxref cvtdbx ON cvtdbx.cvterm_id = cvt.cvterm_id
    JOIN dbxref dbx ON dbx.dbxref_id = cvtdbx.dbxref_id
    JOIN db ON db.db_id = dbx.db_id
    LEFT OUTER JOIN dbxrefprop dbxp ON dbxp.dbxref_id = dbx.dbxref_id
        AND dbxp.type_id = (SELECT cvterm_id FROM cvterm WHERE name = 'ec_description')
    WHERE cvt.is_obsolete = 0
      AND cv.name = 'molecular_function'
      AND db.name = 'EC';";

#[derive(Debug, Clone, Default)]
pub struct GeneGroup {
    pub id: String,
    pub name: String,
    pub members: MultiValued<String>,
    pub go_terms: MultiValued<i64>,
}

impl Entity for GeneGroup {
    fn public_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnzymeGene {
    pub id: String,
    pub symbol: String,
    pub full_name: Scalar<String>,
    pub negated_go_terms: MultiValued<i64>,
    pub go_terms: MultiValued<i64>,
}

impl Entity for EnzymeGene {
    fn public_id(&self) -> &str {
        &self.id
    }
}

/// An EC number and its description, when chado has one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EcEntry {
    pub number: String,
    pub name: Option<String>,
}

/// GO MF term ids and names, and the EC numbers mapped to each term.
#[derive(Debug, Default)]
pub struct GoMfLookup {
    terms: BTreeMap<i64, (String, String)>,
    ec: BTreeMap<i64, Vec<EcEntry>>,
}

impl GoMfLookup {
    pub fn load(chado: &mut dyn ChadoClient) -> Result<Self, ReportError> {
        let mut lookup = Self::default();
        for row in chado.query(GO_MF_TERMS_QUERY)? {
            lookup
                .terms
                .insert(row.int(0)?, (row.text(1)?.to_string(), row.text(2)?.to_string()));
        }
        for row in chado.query(GO_EC_QUERY)? {
            let name = row
                .opt_text(2)?
                .map(|name| name.strip_suffix('.').unwrap_or(name).to_string());
            lookup.ec.entry(row.int(0)?).or_default().push(EcEntry {
                number: row.text(1)?.to_string(),
                name,
            });
        }
        info!(
            terms = lookup.terms.len(),
            mapped_to_ec = lookup.ec.len(),
            "loaded GO molecular function lookups"
        );
        Ok(lookup)
    }

    /// `(GO id, GO name)` pairs for the known terms.
    fn term_pairs(&self, terms: &MultiValued<i64>) -> MultiValued<(String, String)> {
        terms
            .normalized()
            .iter()
            .filter_map(|term| self.terms.get(term).cloned())
            .collect()
    }

    fn ec_entries(&self, terms: &MultiValued<i64>) -> Vec<EcEntry> {
        let mut entries: Vec<EcEntry> = terms
            .normalized()
            .iter()
            .filter_map(|term| self.ec.get(term))
            .flatten()
            .cloned()
            .collect();
        entries.sort();
        entries.dedup();
        entries
    }
}

/// Negated annotations have to be recorded before [`enrich_go_terms`] runs.
pub fn enrich_negated_go_terms(
    genes: &mut EntityRegistry<String, EnzymeGene>,
    rows: &[Row],
) -> Result<EnrichmentStats, ReportError> {
    genes.enrich("negated GO MF annotations", rows, |gene, row| {
        Ok(gene.negated_go_terms.push(row.int(1)?))
    })
}

/// Skips terms the gene is already annotated as NOT having.
pub fn enrich_go_terms(
    genes: &mut EntityRegistry<String, EnzymeGene>,
    rows: &[Row],
) -> Result<EnrichmentStats, ReportError> {
    genes.enrich("GO MF annotations", rows, |gene, row| {
        let term = row.int(1)?;
        if gene.negated_go_terms.values().contains(&term) {
            return Ok(Applied::Ignored);
        }
        Ok(gene.go_terms.push(term))
    })
}

pub struct EnzymeGeneGroups;

impl EnzymeGeneGroups {
    pub fn collect_groups(
        &self,
        chado: &mut dyn ChadoClient,
    ) -> Result<EntityRegistry<String, GeneGroup>, ReportError> {
        let rows = chado.query(GROUPS_QUERY)?;
        let mut groups = EntityRegistry::from_rows(&rows, |row| {
            Ok(GeneGroup {
                id: row.text(0)?.to_string(),
                name: row.text(1)?.to_string(),
                ..GeneGroup::default()
            })
        })?;
        groups.enrich("group members", &chado.query(MEMBERS_QUERY)?, |group, row| {
            Ok(group.members.push(row.text(1)?.to_string()))
        })?;
        groups.enrich("group GO MF annotations", &chado.query(GROUP_GO_MF_QUERY)?, |group, row| {
            Ok(group.go_terms.push(row.int(1)?))
        })?;
        Ok(groups)
    }

    pub fn collect_genes(
        &self,
        chado: &mut dyn ChadoClient,
    ) -> Result<EntityRegistry<String, EnzymeGene>, ReportError> {
        let rows = chado.query(GENES_QUERY)?;
        let mut genes = EntityRegistry::from_rows(&rows, |row| {
            Ok(EnzymeGene {
                id: row.text(0)?.to_string(),
                symbol: row.text(1)?.to_string(),
                ..EnzymeGene::default()
            })
        })?;
        genes.enrich("gene full names", &chado.query(FULLNAMES_QUERY)?, |gene, row| {
            Ok(gene.full_name.set(row.text(1)?.to_string()))
        })?;
        enrich_negated_go_terms(&mut genes, &chado.query(NEGATED_GENE_GO_MF_QUERY)?)?;
        enrich_go_terms(&mut genes, &chado.query(GENE_GO_MF_QUERY)?)?;
        Ok(genes)
    }
}

/// One row per group member. Group EC names skip numbers without a
/// description; gene ECs are only reported when they have one.
pub fn enzyme_row(group: &GeneGroup, gene: &EnzymeGene, lookup: &GoMfLookup) -> FlatRecord {
    let group_ecs = lookup.ec_entries(&group.go_terms);
    let group_ec_numbers: MultiValued<String> =
        group_ecs.iter().map(|entry| entry.number.clone()).collect();
    let group_ec_names: MultiValued<String> =
        group_ecs.iter().filter_map(|entry| entry.name.clone()).collect();
    let gene_ecs: MultiValued<(String, String)> = lookup
        .ec_entries(&gene.go_terms)
        .into_iter()
        .filter_map(|entry| match entry.name {
            Some(name) if !name.is_empty() => Some((entry.number, name)),
            _ => None,
        })
        .collect();

    FlatRecord::builder()
        .text(group.id.clone())
        .text(group.name.clone())
        .pairs(&lookup.term_pairs(&group.go_terms))
        .list(&group_ec_numbers)
        .list(&group_ec_names)
        .text(gene.id.clone())
        .text(gene.symbol.clone())
        .scalar(&gene.full_name)
        .pairs(&gene_ecs)
        .build()
}

impl Report for EnzymeGeneGroups {
    fn label(&self) -> &'static str {
        "Dmel_enzyme_data"
    }

    fn title(&self) -> &'static str {
        "FlyBase D. melanogaster enzyme data for genes and gene groups"
    }

    fn columns(&self) -> &'static [&'static str] {
        &[
            "gene_group_id",
            "gene_group_name",
            "gene_group_GO_id(s)",
            "gene_group_GO_name(s)",
            "gene_group_EC_number(s)",
            "gene_group_EC_name(s)",
            "gene_id",
            "gene_symbol",
            "gene_name",
            "gene_EC_number(s)",
            "gene_EC_name(s)",
        ]
    }

    fn sort_columns(&self) -> &'static [usize] {
        &[0, 6]
    }

    fn build(&self, chado: &mut dyn ChadoClient) -> Result<Vec<FlatRecord>, ReportError> {
        let groups = self.collect_groups(chado)?;
        let genes = self.collect_genes(chado)?;
        let lookup = GoMfLookup::load(chado)?;

        let mut records = Vec::new();
        let mut unknown_members = 0usize;
        for group in groups.values() {
            for member in group.members.normalized() {
                match genes.get(&member) {
                    Some(gene) => records.push(enzyme_row(group, gene, &lookup)),
                    None => unknown_members += 1,
                }
            }
        }
        info!(
            rows = records.len(),
            unknown_members, "paired enzyme groups with member genes"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chado::testing::StaticChado;
    use crate::row;

    fn genes() -> EntityRegistry<String, EnzymeGene> {
        EntityRegistry::from_rows(&[row!("FBgn0000153", "b")], |row| {
            Ok(EnzymeGene {
                id: row.text(0)?.to_string(),
                symbol: row.text(1)?.to_string(),
                ..EnzymeGene::default()
            })
        })
        .unwrap()
    }

    #[test]
    fn negated_terms_are_excluded_only_when_recorded_first() {
        let positive = [row!("FBgn0000153", 10i64), row!("FBgn0000153", 20i64)];
        let negated = [row!("FBgn0000153", 20i64)];

        let mut in_order = genes();
        enrich_negated_go_terms(&mut in_order, &negated).unwrap();
        let stats = enrich_go_terms(&mut in_order, &positive).unwrap();
        assert_eq!(stats.ignored, 1);

        let mut reversed = genes();
        enrich_go_terms(&mut reversed, &positive).unwrap();
        enrich_negated_go_terms(&mut reversed, &negated).unwrap();

        let key = "FBgn0000153".to_string();
        assert_eq!(in_order.get(&key).unwrap().go_terms.normalized(), [10]);
        assert_eq!(reversed.get(&key).unwrap().go_terms.normalized(), [10, 20]);
    }

    #[test]
    fn one_row_per_group_member() {
        let mut chado = StaticChado::default()
            .with(GROUPS_QUERY, vec![row!("FBgg0000100", "ALCOHOL DEHYDROGENASES")])
            .with(
                MEMBERS_QUERY,
                vec![
                    row!("FBgg0000100", "FBgn0000055"),
                    row!("FBgg0000100", "FBgn0000011"),
                    row!("FBgg0000100", "FBgn9999999"),
                ],
            )
            .with(GROUP_GO_MF_QUERY, vec![row!("FBgg0000100", 1i64)])
            .with(
                GENES_QUERY,
                vec![row!("FBgn0000055", "Adh"), row!("FBgn0000011", "ab")],
            )
            .with(
                FULLNAMES_QUERY,
                vec![row!("FBgn0000055", "Alcohol dehydrogenase")],
            )
            .with(NEGATED_GENE_GO_MF_QUERY, vec![row!("FBgn0000011", 1i64)])
            .with(
                GENE_GO_MF_QUERY,
                vec![row!("FBgn0000055", 1i64), row!("FBgn0000011", 1i64)],
            )
            .with(
                GO_MF_TERMS_QUERY,
                vec![row!(1i64, "GO:0004022", "alcohol dehydrogenase (NAD+) activity")],
            )
            .with(
                GO_EC_QUERY,
                vec![
                    row!(1i64, "1.1.1.1", "alcohol dehydrogenase."),
                    row!(1i64, "1.1.1.-", Option::<&str>::None),
                ],
            );

        let records = EnzymeGeneGroups.build(&mut chado).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].cells(),
            [
                "FBgg0000100",
                "ALCOHOL DEHYDROGENASES",
                "GO:0004022",
                "alcohol dehydrogenase (NAD+) activity",
                "1.1.1.-|1.1.1.1",
                "alcohol dehydrogenase",
                "FBgn0000011",
                "ab",
                "",
                "",
                "",
            ]
        );
        assert_eq!(records[1].cell(6), "FBgn0000055");
        assert_eq!(records[1].cell(8), "Alcohol dehydrogenase");
        assert_eq!(records[1].cell(9), "1.1.1.1");
        assert_eq!(records[1].cell(10), "alcohol dehydrogenase");
        assert_eq!(records[1].len(), EnzymeGeneGroups.columns().len());
    }
}
