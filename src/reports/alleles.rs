//! Allele record and enrichment pipeline shared by the classical and
//! transgenic allele reports. Both reports collect the same attributes and
//! differ in the driving query, which side of the transgenic split they keep,
//! and their columns.

use regex::Regex;
use tracing::info;

use crate::chado::{ChadoClient, Row};
use crate::error::ReportError;
use crate::registry::{Applied, Entity, EntityRegistry, MultiValued, Scalar};
use crate::reports::name_and_id;
use crate::text::clean_free_text;

pub const STOCK_ID_PATTERN: &str = r"FBst[0-9]{7}";

pub const CONSTRUCTS_QUERY: &str = "
    SELECT DISTINCT a.feature_id, c.name, c.uniquename
    FROM feature a
    JOIN feature_relationship fr ON fr.subject_id = a.feature_id
    JOIN feature c ON c.feature_id = fr.object_id
    JOIN cvterm t ON t.cvterm_id = fr.type_id
    WHERE a.is_obsolete IS FALSE
      AND a.uniquename ~ '^FBal[0-9]{7}$'
      AND c.is_obsolete IS FALSE
      AND c.uniquename ~ '^FBtp[0-9]{7}$'
      AND t.name = 'associated_with';";

pub const IN_VITRO_QUERY: &str = "
    SELECT DISTINCT f.feature_id
    FROM feature f
    JOIN feature_cvterm fcvt ON fcvt.feature_id = f.feature_id
    JOIN cvterm cvt ON cvt.cvterm_id = fcvt.cvterm_id
    WHERE f.is_obsolete IS FALSE
      AND f.uniquename ~ '^FBal[0-9]{7}$'
      AND cvt.name = 'in vitro construct';";

pub const GENES_QUERY: &str = "
    SELECT DISTINCT a.feature_id, g.name, g.uniquename
    FROM feature a
    JOIN feature_relationship fr ON fr.subject_id = a.feature_id
    JOIN feature g ON g.feature_id = fr.object_id
    JOIN cvterm t ON t.cvterm_id = fr.type_id
    WHERE a.is_obsolete IS FALSE
      AND a.uniquename ~ '^FBal[0-9]{7}$'
      AND g.is_obsolete IS FALSE
      AND g.uniquename ~ '^FBgn[0-9]{7}$'
      AND t.name = 'alleleof';";

pub const ALLELE_CLASSES_QUERY: &str = "
    SELECT DISTINCT f.feature_id, cvt.name, db.name||':'||dbx.accession
    FROM feature f
    JOIN feature_cvterm fcvt ON fcvt.feature_id = f.feature_id
    JOIN cvterm cvt ON cvt.cvterm_id = fcvt.cvterm_id
    JOIN dbxref dbx ON dbx.dbxref_id = cvt.dbxref_id
    JOIN db ON db.db_id = dbx.db_id
    JOIN cvtermprop cvtp ON cvtp.cvterm_id = cvt.cvterm_id
    JOIN cvterm t ON t.cvterm_id = cvtp.type_id
    WHERE f.is_obsolete IS FALSE
      AND f.uniquename ~ '^FBal[0-9]{7}$'
      AND fcvt.is_not IS FALSE
      AND cvt.is_obsolete = 0
      AND t.name = 'webcv'
      AND cvtp.value = 'allele_class';";

pub const PRODUCT_CLASSES_QUERY: &str = "
    SELECT DISTINCT f.feature_id, cvt.name, db.name||':'||dbx.accession
    FROM feature f
    JOIN feature_cvterm fcvt ON fcvt.feature_id = f.feature_id
    JOIN cvterm cvt ON cvt.cvterm_id = fcvt.cvterm_id
    JOIN dbxref dbx ON dbx.dbxref_id = cvt.dbxref_id
    JOIN db ON db.db_id = dbx.db_id
    JOIN feature_cvtermprop fcvtp ON fcvtp.feature_cvterm_id = fcvt.feature_cvterm_id
    JOIN cvterm t ON t.cvterm_id = fcvtp.type_id
    WHERE f.is_obsolete IS FALSE
      AND f.uniquename ~ '^FBal[0-9]{7}$'
      AND fcvt.is_not IS FALSE
      AND cvt.is_obsolete = 0
      AND t.name = 'transgenic_product_class'
      AND db.name = 'SO';";

pub const INSERTIONS_QUERY: &str = "
    SELECT DISTINCT a.feature_id, i.name, i.uniquename
    FROM feature a
    JOIN feature_relationship fr ON fr.subject_id = a.feature_id
    JOIN feature i ON i.feature_id = fr.object_id
    JOIN cvterm t ON t.cvterm_id = fr.type_id
    WHERE a.is_obsolete IS FALSE
      AND a.uniquename ~ '^FBal[0-9]{7}$'
      AND i.is_obsolete IS FALSE
      AND i.uniquename ~ '^FBti[0-9]{7}$'
      AND t.name = 'associated_with';";

pub const INSERTED_ELEMENT_TYPES_QUERY: &str = "
    SELECT DISTINCT a.feature_id, cvt.name, db.name||':'||dbx.accession
    FROM feature a
    JOIN feature_relationship fr ON fr.subject_id = a.feature_id
    JOIN feature i ON i.feature_id = fr.object_id
    JOIN cvterm t ON t.cvterm_id = fr.type_id
    JOIN feature_cvterm fcvt ON fcvt.feature_id = i.feature_id
    JOIN cvterm cvt ON cvt.cvterm_id = fcvt.cvterm_id
    JOIN dbxref dbx ON dbx.dbxref_id = cvt.dbxref_id
    JOIN db ON db.db_id = dbx.db_id
    JOIN feature_cvtermprop fcvtp ON fcvtp.feature_cvterm_id = fcvt.feature_cvterm_id
    JOIN cvterm pt ON pt.cvterm_id = fcvtp.type_id
    WHERE a.is_obsolete IS FALSE
      AND a.uniquename ~ '^FBal[0-9]{7}$'
      AND i.is_obsolete IS FALSE
      AND i.uniquename ~ '^FBti[0-9]{7}$'
      AND t.name = 'associated_with'
      AND pt.name = 'inserted_element_type'
      AND db.name = 'SO';";

pub const DESCRIPTIONS_QUERY: &str = "
    SELECT DISTINCT f.feature_id, fp.value, STRING_AGG(DISTINCT p.uniquename, '+')
    FROM feature f
    JOIN featureprop fp ON fp.feature_id = f.feature_id
    JOIN cvterm cvt ON cvt.cvterm_id = fp.type_id
    JOIN featureprop_pub fpp ON fpp.featureprop_id = fp.featureprop_id
    JOIN pub p ON p.pub_id = fpp.pub_id
    WHERE f.is_obsolete IS FALSE
      AND f.uniquename ~ '^FBal[0-9]{7}$'
      AND cvt.name IN ('aminoacid_rep', 'molecular_info', 'nucleotide_sub')
    GROUP BY f.feature_id, fp.value;";

pub const STOCKS_QUERY: &str = "
    SELECT DISTINCT f.feature_id, fp.value
    FROM feature f
    JOIN featureprop fp ON fp.feature_id = f.feature_id
    JOIN cvterm cvt ON cvt.cvterm_id = fp.type_id
    WHERE f.is_obsolete IS FALSE
      AND f.uniquename ~ '^FBal[0-9]{7}$'
      AND cvt.name ~ '^derived_stock';";

/// Direct allele-to-component relationships, each filling its own column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    RegulatoryRegion,
    EncodedTool,
    TaggedWith,
    AlsoCarries,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::RegulatoryRegion,
        Component::EncodedTool,
        Component::TaggedWith,
        Component::AlsoCarries,
    ];

    pub fn relationship(self) -> &'static str {
        match self {
            Component::RegulatoryRegion => "has_reg_region",
            Component::EncodedTool => "encodes_tool",
            Component::TaggedWith => "tagged_with",
            Component::AlsoCarries => "carries_tool",
        }
    }

    pub fn query(self) -> String {
        format!(
            "
    SELECT DISTINCT a.feature_id, component.name, component.uniquename
    FROM feature a
    JOIN feature_relationship fr ON fr.subject_id = a.feature_id
    JOIN cvterm t ON t.cvterm_id = fr.type_id
    JOIN feature component ON component.feature_id = fr.object_id
    WHERE a.is_obsolete IS FALSE
      AND a.uniquename ~ '^FBal[0-9]{{7}}$'
      AND t.name = '{}'
      AND component.is_obsolete IS FALSE
      AND component.uniquename ~ '^FB[a-z]{{2}}[0-9]{{7,10}}$';",
            self.relationship()
        )
    }

    fn field(self, allele: &mut AlleleRecord) -> &mut MultiValued<(String, String)> {
        match self {
            Component::RegulatoryRegion => &mut allele.regulatory_regions,
            Component::EncodedTool => &mut allele.encoded_tools,
            Component::TaggedWith => &mut allele.tagged_with,
            Component::AlsoCarries => &mut allele.also_carries,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlleleRecord {
    pub symbol: String,
    pub id: String,
    pub gene: Scalar<(String, String)>,
    pub allele_classes: MultiValued<(String, String)>,
    pub constructs: MultiValued<(String, String)>,
    pub product_classes: MultiValued<(String, String)>,
    pub insertions: MultiValued<(String, String)>,
    pub inserted_element_types: MultiValued<(String, String)>,
    pub regulatory_regions: MultiValued<(String, String)>,
    pub encoded_tools: MultiValued<(String, String)>,
    pub tagged_with: MultiValued<(String, String)>,
    pub also_carries: MultiValued<(String, String)>,
    /// `(text, FBrf+FBrf...)`
    pub descriptions: MultiValued<(String, String)>,
    pub stocks: MultiValued<String>,
    pub stock_count: usize,
    pub in_vitro_construct: bool,
    pub transgenic: bool,
}

impl AlleleRecord {
    pub fn new(symbol: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            id: id.into(),
            ..Self::default()
        }
    }
}

impl Entity for AlleleRecord {
    fn public_id(&self) -> &str {
        &self.id
    }
}

/// Transgenic alleles have a construct or are annotated as in vitro
/// constructs; either is enough.
pub fn classify(allele: &mut AlleleRecord) {
    allele.transgenic = !allele.constructs.is_empty() || allele.in_vitro_construct;
    allele.stock_count = allele.stocks.distinct_count();
}

fn description(row: &Row) -> Result<(String, String), ReportError> {
    Ok((
        clean_free_text(row.text(1)?),
        row.opt_text(2)?.unwrap_or_default().to_string(),
    ))
}

/// Registers the alleles returned by `driving_query` and runs every
/// enricher in order, ending with transgenic classification.
pub fn collect_alleles(
    chado: &mut dyn ChadoClient,
    driving_query: &str,
) -> Result<EntityRegistry<i64, AlleleRecord>, ReportError> {
    let rows = chado.query(driving_query)?;
    let mut alleles = EntityRegistry::from_rows(&rows, |row| {
        let (symbol, id) = name_and_id(row)?;
        Ok(AlleleRecord::new(symbol, id))
    })?;

    alleles.enrich("transgenic constructs", &chado.query(CONSTRUCTS_QUERY)?, |allele, row| {
        Ok(allele.constructs.push(name_and_id(row)?))
    })?;
    alleles.enrich("in vitro constructs", &chado.query(IN_VITRO_QUERY)?, |allele, _| {
        allele.in_vitro_construct = true;
        Ok(Applied::Added)
    })?;
    alleles.enrich("genes", &chado.query(GENES_QUERY)?, |allele, row| {
        Ok(allele.gene.set(name_and_id(row)?))
    })?;
    alleles.enrich("allele classes", &chado.query(ALLELE_CLASSES_QUERY)?, |allele, row| {
        Ok(allele.allele_classes.push(name_and_id(row)?))
    })?;
    alleles.enrich(
        "transgenic product classes",
        &chado.query(PRODUCT_CLASSES_QUERY)?,
        |allele, row| Ok(allele.product_classes.push(name_and_id(row)?)),
    )?;
    alleles.enrich("insertions", &chado.query(INSERTIONS_QUERY)?, |allele, row| {
        Ok(allele.insertions.push(name_and_id(row)?))
    })?;
    alleles.enrich(
        "inserted element types",
        &chado.query(INSERTED_ELEMENT_TYPES_QUERY)?,
        |allele, row| Ok(allele.inserted_element_types.push(name_and_id(row)?)),
    )?;
    alleles.enrich("descriptions", &chado.query(DESCRIPTIONS_QUERY)?, |allele, row| {
        Ok(allele.descriptions.push(description(row)?))
    })?;

    let stock_id = Regex::new(STOCK_ID_PATTERN)?;
    alleles.enrich("stocks", &chado.query(STOCKS_QUERY)?, |allele, row| {
        let text = row.text(1)?;
        Ok(allele
            .stocks
            .extend(stock_id.find_iter(text).map(|found| found.as_str().to_string())))
    })?;

    for component in Component::ALL {
        alleles.enrich(component.relationship(), &chado.query(&component.query())?, |allele, row| {
            Ok(component.field(allele).push(name_and_id(row)?))
        })?;
    }

    alleles.classify(classify);
    let transgenic = alleles.values().filter(|allele| allele.transgenic).count();
    info!(
        alleles = alleles.len(),
        transgenic, "classified transgenic alleles"
    );
    Ok(alleles)
}
