use std::collections::HashMap;
use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use chrono::{NaiveDate, NaiveDateTime};

use flybase_bulk_reports::app::App;
use flybase_bulk_reports::chado::{ChadoClient, Row};
use flybase_bulk_reports::config::{ConnectionSettings, ResolvedConfig};
use flybase_bulk_reports::domain::ReportFormat;
use flybase_bulk_reports::error::ReportError;
use flybase_bulk_reports::reports::organisms::{DROSOPHILID_QUERY, ORGANISMS_QUERY, TAXON_ID_QUERY};
use flybase_bulk_reports::reports::best_gene_summary::{
    GENES_QUERY, INTERACTIVE_FLY_QUERY, SNAPSHOTS_QUERY, UNIPROT_QUERY,
};
use flybase_bulk_reports::reports::{BestGeneSummary, ChemSynonyms, Organisms};
use flybase_bulk_reports::row;

#[derive(Default)]
struct MockChado {
    results: HashMap<String, Vec<Row>>,
    fail_on: Option<String>,
    queries: usize,
}

impl MockChado {
    fn with(mut self, sql: &str, rows: Vec<Row>) -> Self {
        self.results.insert(sql.to_string(), rows);
        self
    }

    fn failing(sql: &str) -> Self {
        Self {
            fail_on: Some(sql.to_string()),
            ..Self::default()
        }
    }
}

impl ChadoClient for MockChado {
    fn query(&mut self, sql: &str) -> Result<Vec<Row>, ReportError> {
        self.queries += 1;
        if self.fail_on.as_deref() == Some(sql) {
            return Err(ReportError::Query("relation \"organism\" does not exist".to_string()));
        }
        Ok(self.results.get(sql).cloned().unwrap_or_default())
    }
}

fn config(root: &str) -> ResolvedConfig {
    ResolvedConfig {
        connection: ConnectionSettings {
            server: "flysql".to_string(),
            port: 5432,
            database: "fb_2024_05_reporting".to_string(),
            username: "reporter".to_string(),
            password: None,
        },
        annotation_release: Some("R6.60".to_string()),
        database_release: "2024_05".to_string(),
        output_dir: Utf8PathBuf::from(root).join("output"),
        input_dir: Utf8PathBuf::from(root).join("input"),
        log_dir: Utf8PathBuf::from(root).join("logs"),
    }
}

fn generated_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 10, 15)
        .and_then(|date| date.and_hms_opt(9, 30, 0))
        .unwrap()
}

fn organisms_chado() -> MockChado {
    MockChado::default()
        .with(
            ORGANISMS_QUERY,
            vec![
                row!(7i64, "Hsap", "Homo", "sapiens", "human"),
                row!(1i64, "Dmel", "Drosophila", "melanogaster", "fruit fly"),
            ],
        )
        .with(TAXON_ID_QUERY, vec![row!(1i64, "7227"), row!(7i64, "9606")])
        .with(DROSOPHILID_QUERY, vec![row!(1i64)])
}

#[test]
fn render_organisms_tsv() {
    let mut app = App::new(organisms_chado(), config("/tmp"));
    let mut out = Vec::new();
    let count = app
        .render(&Organisms, ReportFormat::Tsv, generated_at(), &mut out)
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "## FlyBase organisms report\n\
         ## Generated: Tue Oct 15 09:30:00 2024\n\
         ## Using datasource: fb_2024_05_reporting\n\
         ##\n\
         ## genus\tspecies\tabbreviation\tcommon_name\tNCBI_taxon_ID\tdrosophilid?\n\
         Drosophila\tmelanogaster\tDmel\tfruit fly\t7227\ty\n\
         Homo\tsapiens\tHsap\thuman\t9606\t\n\
         ## Finished FlyBase organisms report.\n"
    );
}

#[test]
fn render_organisms_json() {
    let mut app = App::new(organisms_chado(), config("/tmp"));
    let mut out = Vec::new();
    app.render(&Organisms, ReportFormat::Json, generated_at(), &mut out)
        .unwrap();

    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let meta = &json["metaData"];
    assert_eq!(meta["dataProvider"], "FlyBase");
    assert_eq!(meta["title"], "FlyBase organisms report");
    assert_eq!(meta["dateProduced"], "Tue Oct 15 09:30:00 2024");
    assert_eq!(meta["databaseRelease"], "2024_05");
    assert_eq!(meta["annotationRelease"], "R6.60");
    assert!(meta.get("note").is_none());

    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["abbreviation"], "Dmel");
    assert_eq!(data[0]["NCBI_taxon_ID"], "7227");
    assert_eq!(data[1]["drosophilid?"], "");
}

#[test]
fn empty_registry_exports_header_and_footer() {
    let mut app = App::new(MockChado::default(), config("/tmp"));
    let mut out = Vec::new();
    let count = app
        .render(&ChemSynonyms, ReportFormat::Tsv, generated_at(), &mut out)
        .unwrap();
    assert_eq!(count, 0);
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[lines.len() - 2],
        "## Publication_ID\tFB_Chemical_ID\tFB_Chemical_Name\tAuthor Synonym"
    );
    assert_eq!(lines[lines.len() - 1], "## Finished FlyBase Chemical Synonyms Report.");
}

#[test]
fn run_writes_report_file() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().to_str().unwrap().to_string();
    let mut app = App::new(organisms_chado(), config(&root));

    let summary = app.run(&Organisms, ReportFormat::Tsv).unwrap();
    assert_eq!(summary.records, 2);
    assert_eq!(
        summary.path,
        Utf8PathBuf::from(&root).join("output/organism_list_fb_2024_05_reporting.tsv")
    );

    let written = fs::read_to_string(summary.path.as_std_path()).unwrap();
    assert!(written.starts_with("## FlyBase organisms report\n"));
    assert!(written.contains("Drosophila\tmelanogaster\tDmel"));

    let leftovers: Vec<_> = fs::read_dir(temp.path().join("output"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(".fb-report"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn failed_query_leaves_no_output() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().to_str().unwrap().to_string();
    let mut app = App::new(MockChado::failing(TAXON_ID_QUERY), config(&root));

    let err = app.run(&Organisms, ReportFormat::Json).unwrap_err();
    assert_matches!(err, ReportError::Query(_));
    assert!(!temp.path().join("output/organism_list_fb_2024_05_reporting.json").exists());
    assert_eq!(app.into_client().queries, 2);
}

#[test]
fn best_gene_summary_prefers_higher_ranked_sources() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().to_str().unwrap().to_string();
    fs::create_dir_all(temp.path().join("input")).unwrap();
    fs::write(
        temp.path().join("input/alliance.tsv"),
        "#\nFB:FBgn0000490\tdpp\tExhibits BMP receptor binding activity.\n\
         FB:FBgn0003716\ttkv\tEnables transforming growth factor beta receptor activity.\n",
    )
    .unwrap();

    let config = config(&root);
    let report = BestGeneSummary::from_config(&config, Some("alliance.tsv"));
    let chado = MockChado::default()
        .with(
            GENES_QUERY,
            vec![
                row!("FBgn0000490", "dpp"),
                row!("FBgn0003716", "tkv"),
                row!("FBgn0000001", "a"),
            ],
        )
        .with(
            SNAPSHOTS_QUERY,
            vec![row!("FBgn0000490", "@dpp@ encodes a\nBMP ligand.")],
        )
        .with(UNIPROT_QUERY, Vec::new())
        .with(INTERACTIVE_FLY_QUERY, Vec::new());
    let mut app = App::new(chado, config);

    let mut out = Vec::new();
    let count = app
        .render(&report, ReportFormat::Tsv, generated_at(), &mut out)
        .unwrap();
    assert_eq!(count, 2);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("## Note: The single best available gene summary"));
    assert!(text.contains("FBgn0000490\tdpp\tFlyBase Gene Snapshot\tdpp encodes a BMP ligand.\n"));
    assert!(text.contains(
        "FBgn0003716\ttkv\tAlliance\tEnables transforming growth factor beta receptor activity.\n"
    ));
    assert!(!text.contains("FBgn0000001"));
    assert!(!text.contains("## Finished"));
}
