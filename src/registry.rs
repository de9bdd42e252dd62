use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use tracing::{debug, info, warn};

use crate::chado::{Row, Value};
use crate::error::ReportError;

/// A record the registry can report on by its public FlyBase identifier.
pub trait Entity {
    fn public_id(&self) -> &str;
}

/// Keys come from the first column of every driving and enrichment row.
pub trait RegistryKey: Ord + Clone + fmt::Debug {
    fn from_value(value: &Value) -> Option<Self>;
}

impl RegistryKey for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl RegistryKey for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(value) => Some(value.clone()),
            _ => None,
        }
    }
}

fn key_of<K: RegistryKey>(row: &Row) -> Result<K, ReportError> {
    let value = row.get(0)?;
    K::from_value(value).ok_or_else(|| ReportError::Column {
        index: 0,
        message: format!("unusable entity key {value:?}"),
    })
}

/// What an enrichment step did to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Added,
    /// A one-to-one field already held a value; the new value replaced it.
    Replaced,
    Ignored,
}

/// One-to-one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar<T>(Option<T>);

impl<T> Default for Scalar<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> Scalar<T> {
    /// Keeps the latest value; reports whether an earlier one was overwritten.
    pub fn set(&mut self, value: T) -> Applied {
        match self.0.replace(value) {
            Some(_) => Applied::Replaced,
            None => Applied::Added,
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

impl<T> From<Option<T>> for Scalar<T> {
    fn from(value: Option<T>) -> Self {
        Self(value)
    }
}

/// One-to-many attribute. Duplicates are kept until flattening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiValued<T>(Vec<T>);

impl<T> Default for MultiValued<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> MultiValued<T> {
    pub fn push(&mut self, value: T) -> Applied {
        self.0.push(value);
        Applied::Added
    }

    pub fn extend<I: IntoIterator<Item = T>>(&mut self, values: I) -> Applied {
        let before = self.0.len();
        self.0.extend(values);
        if self.0.len() > before {
            Applied::Added
        } else {
            Applied::Ignored
        }
    }

    pub fn values(&self) -> &[T] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Ord + Clone> MultiValued<T> {
    /// Distinct values in ascending order.
    pub fn normalized(&self) -> Vec<T> {
        let mut values = self.0.clone();
        values.sort();
        values.dedup();
        values
    }

    pub fn distinct_count(&self) -> usize {
        self.normalized().len()
    }
}

impl<T> FromIterator<T> for MultiValued<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub applied: usize,
    pub replaced: usize,
    pub ignored: usize,
    /// Rows whose key is not a registered entity.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub kept: usize,
    pub excluded: usize,
}

/// Primary-key ordered collection of the entities a report covers. Once the
/// driving query has populated it, enrichment can only touch existing
/// entries.
#[derive(Debug, Clone)]
pub struct EntityRegistry<K, R> {
    entities: BTreeMap<K, R>,
}

impl<K, R> Default for EntityRegistry<K, R> {
    fn default() -> Self {
        Self {
            entities: BTreeMap::new(),
        }
    }
}

impl<K: RegistryKey, R: Entity> EntityRegistry<K, R> {
    /// Builds one record per distinct key in column 0. When a key repeats,
    /// the first row wins and the duplicate is logged.
    pub fn from_rows<F>(rows: &[Row], mut build: F) -> Result<Self, ReportError>
    where
        F: FnMut(&Row) -> Result<R, ReportError>,
    {
        let mut registry = Self::default();
        let mut duplicates = 0usize;
        for row in rows {
            let key = key_of::<K>(row)?;
            match registry.entities.entry(key) {
                Entry::Occupied(existing) => {
                    duplicates += 1;
                    warn!(
                        entity = existing.get().public_id(),
                        key = ?existing.key(),
                        "driving query returned a duplicate key; keeping the first row"
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert(build(row)?);
                }
            }
        }
        info!(
            entities = registry.entities.len(),
            duplicates, "registered entities from driving query"
        );
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&R> {
        self.entities.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entities.contains_key(key)
    }

    pub fn values(&self) -> impl Iterator<Item = &R> {
        self.entities.values()
    }

    /// Applies a `(key, values...)` result set to the registered entities.
    pub fn enrich<F>(
        &mut self,
        enricher: &str,
        rows: &[Row],
        mut apply: F,
    ) -> Result<EnrichmentStats, ReportError>
    where
        F: FnMut(&mut R, &Row) -> Result<Applied, ReportError>,
    {
        let keyed = rows
            .iter()
            .map(|row| Ok((key_of::<K>(row)?, row)))
            .collect::<Result<Vec<_>, ReportError>>()?;
        self.enrich_keyed(enricher, keyed, |record, row| apply(record, row))
    }

    /// Applies already-keyed items, e.g. lines of a supplementary file.
    pub fn enrich_keyed<T, I, F>(
        &mut self,
        enricher: &str,
        items: I,
        mut apply: F,
    ) -> Result<EnrichmentStats, ReportError>
    where
        I: IntoIterator<Item = (K, T)>,
        F: FnMut(&mut R, T) -> Result<Applied, ReportError>,
    {
        let mut stats = EnrichmentStats::default();
        for (key, item) in items {
            let Some(record) = self.entities.get_mut(&key) else {
                stats.skipped += 1;
                debug!(enricher, key = ?key, "no registered entity for key");
                continue;
            };
            match apply(record, item)? {
                Applied::Added => stats.applied += 1,
                Applied::Replaced => {
                    stats.applied += 1;
                    stats.replaced += 1;
                    warn!(
                        enricher,
                        entity = record.public_id(),
                        "one-to-one field received another value; keeping the latest"
                    );
                }
                Applied::Ignored => stats.ignored += 1,
            }
        }
        info!(
            enricher,
            applied = stats.applied,
            replaced = stats.replaced,
            ignored = stats.ignored,
            skipped = stats.skipped,
            "enrichment complete"
        );
        Ok(stats)
    }

    /// Post-processing: derive flags from enriched fields.
    pub fn classify<F>(&mut self, mut classify: F)
    where
        F: FnMut(&mut R),
    {
        for record in self.entities.values_mut() {
            classify(record);
        }
    }

    /// Post-processing: drop entities that do not belong in the export.
    pub fn retain<F>(&mut self, filter: &str, mut keep: F) -> FilterStats
    where
        F: FnMut(&R) -> bool,
    {
        let before = self.entities.len();
        self.entities.retain(|_, record| keep(record));
        let stats = FilterStats {
            kept: self.entities.len(),
            excluded: before - self.entities.len(),
        };
        info!(
            filter,
            kept = stats.kept,
            excluded = stats.excluded,
            "filter applied"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    use crate::row;

    #[derive(Debug, Clone, PartialEq)]
    struct Gene {
        id: String,
        name: String,
        full_name: Scalar<String>,
        synonyms: MultiValued<String>,
    }

    impl Entity for Gene {
        fn public_id(&self) -> &str {
            &self.id
        }
    }

    fn genes(rows: &[Row]) -> EntityRegistry<i64, Gene> {
        EntityRegistry::from_rows(rows, |row| {
            Ok(Gene {
                id: row.text(1)?.to_string(),
                name: row.text(2)?.to_string(),
                full_name: Scalar::default(),
                synonyms: MultiValued::default(),
            })
        })
        .unwrap()
    }

    #[test]
    fn duplicate_driving_keys_keep_first() {
        let registry = genes(&[row!(1, "FBgn1", "wg"), row!(1, "FBgn1", "wingless")]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&1).unwrap().name, "wg");
    }

    #[test]
    fn empty_driving_query_is_fine() {
        let registry = genes(&[]);
        assert!(registry.is_empty());
    }

    #[test]
    fn scalar_replacement_is_counted() {
        let mut registry = genes(&[row!(1, "FBgn1", "wg")]);
        let stats = registry
            .enrich("full names", &[row!(1, "wingless"), row!(1, "Wnt oncogene analog 1")], |gene, row| {
                Ok(gene.full_name.set(row.text(1)?.to_string()))
            })
            .unwrap();
        assert_eq!(stats.applied, 2);
        assert_eq!(stats.replaced, 1);
        assert_eq!(
            registry.get(&1).unwrap().full_name.get().map(String::as_str),
            Some("Wnt oncogene analog 1")
        );
    }

    #[test]
    fn null_key_is_malformed() {
        let mut registry = genes(&[row!(1, "FBgn1", "wg")]);
        let result = registry.enrich("synonyms", &[row!(Option::<i64>::None, "x")], |gene, row| {
            Ok(gene.synonyms.push(row.text(1)?.to_string()))
        });
        assert_matches!(result, Err(ReportError::Column { index: 0, .. }));
    }

    #[test]
    fn normalized_is_sorted_and_distinct() {
        let values: MultiValued<String> = ["b", "a", "a", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(values.normalized(), vec!["a", "b", "c"]);
        assert_eq!(values.len(), 4);
        assert_eq!(values.distinct_count(), 3);
    }
}
