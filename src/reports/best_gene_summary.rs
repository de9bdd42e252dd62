use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::chado::ChadoClient;
use crate::config::ResolvedConfig;
use crate::domain::FlyBaseId;
use crate::error::ReportError;
use crate::flatten::{FlatRecord, Flatten, flatten_registry};
use crate::registry::{Applied, Entity, EntityRegistry, MultiValued, Scalar};
use crate::reports::Report;
use crate::text::{Encoding, clean_free_text, convert};

pub const GENES_QUERY: &str = "
    SELECT DISTINCT f.uniquename, f.name
    FROM feature f
    JOIN organism o ON o.organism_id = f.organism_id
    WHERE f.is_obsolete IS FALSE
      AND f.uniquename ~ '^FBgn[0-9]{7}$'
      AND o.abbreviation = 'Dmel';";

pub const SNAPSHOTS_QUERY: &str = "
    SELECT DISTINCT f.uniquename, fp.value
    FROM feature f
    JOIN organism o ON o.organism_id = f.organism_id
    JOIN featureprop fp ON fp.feature_id = f.feature_id
    JOIN cvterm cvt ON cvt.cvterm_id = fp.type_id
    WHERE f.is_obsolete IS FALSE
      AND f.uniquename ~ '^FBgn[0-9]{7}$'
      AND o.abbreviation = 'Dmel'
      AND cvt.name = 'gene_summary_text';";

pub const UNIPROT_QUERY: &str = "
    SELECT DISTINCT f.uniquename, gcrp_xref.accession, dbxp.value
    FROM feature f
    JOIN organism o ON o.organism_id = f.organism_id
    JOIN feature_dbxref fdbx ON fdbx.feature_id = f.feature_id
    JOIN dbxref gcrp_xref ON gcrp_xref.dbxref_id = fdbx.dbxref_id
    JOIN db gcrp ON gcrp.db_id = gcrp_xref.db_id
    JOIN dbxref swissprot_xref ON swissprot_xref.accession = gcrp_xref.accession
    JOIN db swissprot ON swissprot.db_id = swissprot_xref.db_id
    JOIN dbxrefprop dbxp ON dbxp.dbxref_id = swissprot_xref.dbxref_id
    JOIN cvterm cvt ON cvt.cvterm_id = dbxp.type_id
    WHERE f.is_obsolete IS FALSE
      AND f.uniquename ~ '^FBgn[0-9]{7}$'
      AND o.abbreviation = 'Dmel'
      AND fdbx.is_current IS TRUE
      AND gcrp.name = 'UniProt/GCRP'
      AND swissprot.name = 'UniProt/Swiss-Prot'
      AND cvt.name = 'UniProt_Function_comment';";

pub const INTERACTIVE_FLY_QUERY: &str = "
    SELECT DISTINCT f.uniquename, dbxp.value
    FROM feature f
    JOIN organism o ON o.organism_id = f.organism_id
    JOIN feature_dbxref fdbx ON fdbx.feature_id = f.feature_id
    JOIN dbxref dbx ON dbx.dbxref_id = fdbx.dbxref_id
    JOIN db ON db.db_id = dbx.db_id
    JOIN dbxrefprop dbxp ON dbxp.dbxref_id = dbx.dbxref_id
    JOIN cvterm cvt ON cvt.cvterm_id = dbxp.type_id
    WHERE f.is_obsolete IS FALSE
      AND f.uniquename ~ '^FBgn[0-9]{7}$'
      AND o.abbreviation = 'Dmel'
      AND fdbx.is_current IS TRUE
      AND db.name = 'INTERACTIVEFLY'
      AND cvt.name = 'if_summary';";

const NO_DESCRIPTION: &str = "No description available";
const SUMMARY_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SummarySource {
    GeneSnapshot,
    UniProtKb,
    InteractiveFly,
    Alliance,
}

impl SummarySource {
    /// Highest rank first.
    pub const RANKED: [SummarySource; 4] = [
        SummarySource::GeneSnapshot,
        SummarySource::UniProtKb,
        SummarySource::InteractiveFly,
        SummarySource::Alliance,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SummarySource::GeneSnapshot => "FlyBase Gene Snapshot",
            SummarySource::UniProtKb => "UniProtKB",
            SummarySource::InteractiveFly => "Interactive Fly",
            SummarySource::Alliance => "Alliance",
        }
    }
}

impl fmt::Display for SummarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeneSummaries {
    pub id: String,
    pub symbol: String,
    pub snapshot: MultiValued<String>,
    pub uniprot: MultiValued<String>,
    pub interactive_fly: MultiValued<String>,
    pub alliance: MultiValued<String>,
    pub best: Scalar<(SummarySource, String)>,
}

impl GeneSummaries {
    pub fn summaries(&self, source: SummarySource) -> &MultiValued<String> {
        match source {
            SummarySource::GeneSnapshot => &self.snapshot,
            SummarySource::UniProtKb => &self.uniprot,
            SummarySource::InteractiveFly => &self.interactive_fly,
            SummarySource::Alliance => &self.alliance,
        }
    }

    fn summaries_mut(&mut self, source: SummarySource) -> &mut MultiValued<String> {
        match source {
            SummarySource::GeneSnapshot => &mut self.snapshot,
            SummarySource::UniProtKb => &mut self.uniprot,
            SummarySource::InteractiveFly => &mut self.interactive_fly,
            SummarySource::Alliance => &mut self.alliance,
        }
    }

    fn add(&mut self, source: SummarySource, text: String) -> Applied {
        if text.is_empty() {
            return Applied::Ignored;
        }
        if !self.summaries(source).is_empty() {
            warn!(gene = %self.id, %source, "gene has multiple summaries from one source");
        }
        self.summaries_mut(source).push(text)
    }

    /// Keeps the highest-ranked source that has anything to say.
    pub fn pick_best(&mut self) {
        for source in SummarySource::RANKED {
            let texts = self.summaries(source).normalized();
            if !texts.is_empty() {
                self.best.set((source, texts.join(SUMMARY_SEPARATOR)));
                return;
            }
        }
    }
}

impl Entity for GeneSummaries {
    fn public_id(&self) -> &str {
        &self.id
    }
}

impl Flatten for GeneSummaries {
    fn flatten(&self) -> FlatRecord {
        let (source, summary) = match self.best.get() {
            Some((source, summary)) => (source.label(), summary.as_str()),
            None => ("", ""),
        };
        FlatRecord::builder()
            .text(self.id.clone())
            .text(self.symbol.clone())
            .text(source)
            .text(summary)
            .build()
    }
}

/// One usable line of the Alliance gene description file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllianceDescription {
    pub gene: FlyBaseId,
    pub symbol: String,
    pub description: String,
}

/// Reads the Alliance automated description file. Comment and blank lines
/// are ignored; short or unparseable lines are logged and skipped, as are
/// placeholder descriptions. A missing file is an error.
pub fn read_alliance_descriptions(path: &Utf8Path) -> Result<Vec<AllianceDescription>, ReportError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .comment(Some(b'#'))
        .from_path(path.as_std_path())
        .map_err(|err| ReportError::InputFile {
            path: path.as_std_path().to_path_buf(),
            message: err.to_string(),
        })?;

    let mut descriptions = Vec::new();
    let mut malformed = 0usize;
    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                malformed += 1;
                warn!(file = %path, error = %err, "skipping unreadable line");
                continue;
            }
        };
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        if record.len() < 3 {
            malformed += 1;
            warn!(
                file = %path,
                record = index + 1,
                columns = record.len(),
                "skipping line with fewer than three columns"
            );
            continue;
        }
        let gene = match record[0].parse::<FlyBaseId>() {
            Ok(gene) => gene,
            Err(err) => {
                malformed += 1;
                warn!(file = %path, record = index + 1, "skipping line: {err}");
                continue;
            }
        };
        if gene.kind() != "gn" {
            malformed += 1;
            warn!(file = %path, record = index + 1, id = %gene, "skipping line for a non-gene id");
            continue;
        }
        let description = record[2].trim();
        if description.starts_with(NO_DESCRIPTION) {
            continue;
        }
        descriptions.push(AllianceDescription {
            gene,
            symbol: record[1].to_string(),
            description: description.to_string(),
        });
    }
    info!(
        file = %path,
        descriptions = descriptions.len(),
        malformed, "read Alliance gene descriptions"
    );
    Ok(descriptions)
}

pub struct BestGeneSummary {
    alliance_file: Utf8PathBuf,
}

impl BestGeneSummary {
    pub fn new(alliance_file: impl Into<Utf8PathBuf>) -> Self {
        Self {
            alliance_file: alliance_file.into(),
        }
    }

    /// `input_filename` overrides the release-named default; relative names
    /// resolve against the input directory.
    pub fn from_config(config: &ResolvedConfig, input_filename: Option<&str>) -> Self {
        let default_name = format!(
            "alliance_gene_descriptions_fb_{}.tsv",
            config.database_release
        );
        Self::new(config.input_path(input_filename.unwrap_or(&default_name)))
    }

    pub fn collect(
        &self,
        chado: &mut dyn ChadoClient,
    ) -> Result<EntityRegistry<String, GeneSummaries>, ReportError> {
        let rows = chado.query(GENES_QUERY)?;
        let mut genes = EntityRegistry::from_rows(&rows, |row| {
            Ok(GeneSummaries {
                id: row.text(0)?.to_string(),
                symbol: row.opt_text(1)?.unwrap_or_default().to_string(),
                ..GeneSummaries::default()
            })
        })?;

        genes.enrich("gene snapshots", &chado.query(SNAPSHOTS_QUERY)?, |gene, row| {
            let text = row.text(1)?.replace('@', "");
            let text = convert(&text, Encoding::ChadoSgml, Encoding::Plain);
            Ok(gene.add(SummarySource::GeneSnapshot, clean_free_text(&text)))
        })?;
        genes.enrich("UniProtKB function comments", &chado.query(UNIPROT_QUERY)?, |gene, row| {
            let accession = row.text(1)?;
            let text = clean_free_text(row.text(2)?);
            Ok(gene.add(SummarySource::UniProtKb, format!("{text} (UniProtKB:{accession})")))
        })?;
        genes.enrich("Interactive Fly summaries", &chado.query(INTERACTIVE_FLY_QUERY)?, |gene, row| {
            Ok(gene.add(SummarySource::InteractiveFly, clean_free_text(row.text(1)?)))
        })?;

        let alliance = read_alliance_descriptions(&self.alliance_file)?;
        genes.enrich_keyed(
            "Alliance descriptions",
            alliance
                .into_iter()
                .map(|line| (line.gene.into_string(), line.description)),
            |gene, description| Ok(gene.add(SummarySource::Alliance, description)),
        )?;

        genes.classify(GeneSummaries::pick_best);
        genes.retain("genes with a summary", |gene| gene.best.is_set());
        Ok(genes)
    }
}

impl Report for BestGeneSummary {
    fn label(&self) -> &'static str {
        "best_gene_summary"
    }

    fn title(&self) -> &'static str {
        "FlyBase Best Gene Summary report"
    }

    fn columns(&self) -> &'static [&'static str] {
        &["FBgn_ID", "Gene_Symbol", "Summary_Source", "Summary"]
    }

    fn notes(&self) -> Vec<String> {
        vec![
            "The single best available gene summary is reported for each D. melanogaster gene."
                .to_string(),
            "Gene summaries are taken from the following sources, in order of decreasing rank:"
                .to_string(),
            "FlyBase gene snapshots, UniProtKB functional descriptions, InteractiveFly summaries, Alliance of Genome Resources automated descriptions."
                .to_string(),
            "For other non-D. melanogaster genes, please see FlyBase's \"automated_gene_summaries.tsv.gz\" file."
                .to_string(),
        ]
    }

    fn footer(&self) -> bool {
        false
    }

    fn build(&self, chado: &mut dyn ChadoClient) -> Result<Vec<FlatRecord>, ReportError> {
        let genes = self.collect(chado)?;
        Ok(flatten_registry(&genes))
    }
}
