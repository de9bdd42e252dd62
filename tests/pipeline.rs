use assert_matches::assert_matches;

use flybase_bulk_reports::chado::Row;
use flybase_bulk_reports::error::ReportError;
use flybase_bulk_reports::flatten::{FlatRecord, Flatten, flatten_registry, sort_records};
use flybase_bulk_reports::registry::{Applied, Entity, EntityRegistry, MultiValued, Scalar};
use flybase_bulk_reports::row;

#[derive(Debug, Clone)]
struct Feature {
    id: String,
    name: String,
    full_name: Scalar<String>,
    synonyms: MultiValued<String>,
    obsolete: bool,
}

impl Entity for Feature {
    fn public_id(&self) -> &str {
        &self.id
    }
}

impl Flatten for Feature {
    fn flatten(&self) -> FlatRecord {
        FlatRecord::builder()
            .text(self.id.clone())
            .text(self.name.clone())
            .scalar(&self.full_name)
            .list(&self.synonyms)
            .count(self.synonyms.distinct_count())
            .build()
    }
}

fn register(rows: &[Row]) -> EntityRegistry<i64, Feature> {
    EntityRegistry::from_rows(rows, |row| {
        Ok(Feature {
            id: row.text(1)?.to_string(),
            name: row.text(2)?.to_string(),
            full_name: Scalar::default(),
            synonyms: MultiValued::default(),
            obsolete: false,
        })
    })
    .unwrap()
}

fn add_synonym(feature: &mut Feature, row: &Row) -> Result<Applied, ReportError> {
    Ok(feature.synonyms.push(row.text(1)?.to_string()))
}

fn two_features() -> EntityRegistry<i64, Feature> {
    register(&[row!(1i64, "X1", "foo"), row!(2i64, "X2", "bar")])
}

#[test]
fn unknown_keys_are_skipped() {
    let mut registry = two_features();
    let stats = registry
        .enrich(
            "synonyms",
            &[row!(1i64, "baz"), row!(3i64, "qux")],
            add_synonym,
        )
        .unwrap();

    assert_eq!(stats.applied, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(registry.len(), 2);
    assert!(!registry.contains(&3));

    let records = flatten_registry(&registry);
    assert_eq!(records[0].cells(), ["X1", "foo", "", "baz", "1"]);
    assert_eq!(records[1].cells(), ["X2", "bar", "", "", "0"]);
}

#[test]
fn enrichment_of_an_absent_key_leaves_registry_unchanged() {
    let mut registry = two_features();
    let before = flatten_registry(&registry);
    let stats = registry
        .enrich("synonyms", &[row!(42i64, "ghost")], add_synonym)
        .unwrap();
    assert_eq!(stats.skipped, 1);
    assert_eq!(flatten_registry(&registry), before);
}

#[test]
fn multi_valued_fields_are_distinct_and_sorted() {
    let mut registry = two_features();
    let rows = [row!(1i64, "b"), row!(1i64, "a"), row!(1i64, "a"), row!(1i64, "c")];
    registry.enrich("synonyms", &rows, add_synonym).unwrap();
    let records = flatten_registry(&registry);
    assert_eq!(records[0].cell(3), "a|b|c");
    assert_eq!(records[0].cell(4), "3");
}

#[test]
fn enricher_row_order_does_not_matter() {
    let rows = vec![
        row!(2i64, "zeta"),
        row!(1i64, "beta"),
        row!(2i64, "alpha"),
        row!(1i64, "gamma"),
        row!(1i64, "beta"),
    ];
    let mut reversed = rows.clone();
    reversed.reverse();

    let mut forward = two_features();
    forward.enrich("synonyms", &rows, add_synonym).unwrap();
    let mut backward = two_features();
    backward.enrich("synonyms", &reversed, add_synonym).unwrap();

    assert_eq!(flatten_registry(&forward), flatten_registry(&backward));
}

#[test]
fn flattening_twice_is_identical() {
    let mut registry = two_features();
    registry
        .enrich("synonyms", &[row!(2i64, "qux"), row!(2i64, "baz")], add_synonym)
        .unwrap();
    assert_eq!(flatten_registry(&registry), flatten_registry(&registry));
}

#[test]
fn scalar_keeps_the_latest_value() {
    let mut registry = two_features();
    let stats = registry
        .enrich(
            "full names",
            &[row!(1i64, "first"), row!(1i64, "second")],
            |feature, row| Ok(feature.full_name.set(row.text(1)?.to_string())),
        )
        .unwrap();
    assert_eq!(stats.applied, 2);
    assert_eq!(stats.replaced, 1);
    assert_eq!(flatten_registry(&registry)[0].cell(2), "second");
}

#[test]
fn duplicate_driving_rows_keep_the_first() {
    let registry = register(&[row!(1i64, "X1", "foo"), row!(1i64, "X1", "renamed")]);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get(&1).map(|feature| feature.name.as_str()), Some("foo"));
}

#[test]
fn excluded_entities_are_not_exported() {
    let mut registry = register(&[
        row!(1i64, "X1", "foo"),
        row!(2i64, "X2", "bar"),
        row!(3i64, "X3", "baz"),
    ]);
    registry
        .enrich("obsolete", &[row!(2i64)], |feature, _| {
            feature.obsolete = true;
            Ok(Applied::Added)
        })
        .unwrap();

    let stats = registry.retain("current only", |feature| !feature.obsolete);
    assert_eq!(stats.kept, 2);
    assert_eq!(stats.excluded, 1);

    let ids: Vec<String> = flatten_registry(&registry)
        .iter()
        .map(|record| record.cell(0).to_string())
        .collect();
    assert_eq!(ids, ["X1", "X3"]);
}

#[test]
fn enrichment_after_filtering_skips_removed_entities() {
    let mut registry = two_features();
    registry.retain("only X1", |feature| feature.id == "X1");
    let stats = registry
        .enrich("synonyms", &[row!(2i64, "late")], add_synonym)
        .unwrap();
    assert_eq!(stats.skipped, 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn mistyped_key_is_an_error() {
    let mut registry = two_features();
    let result = registry.enrich("synonyms", &[row!("1", "baz")], add_synonym);
    assert_matches!(result, Err(ReportError::Column { index: 0, .. }));
}

#[test]
fn records_sort_on_several_columns() {
    let mut records = vec![
        FlatRecord::from_cells(vec!["b".into(), "2".into()]),
        FlatRecord::from_cells(vec!["a".into(), "9".into()]),
        FlatRecord::from_cells(vec!["b".into(), "1".into()]),
    ];
    sort_records(&mut records, &[0, 1]);
    assert_eq!(records[0].cells(), ["a", "9"]);
    assert_eq!(records[1].cells(), ["b", "1"]);
    assert_eq!(records[2].cells(), ["b", "2"]);
}
