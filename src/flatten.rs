use crate::registry::{Entity, EntityRegistry, MultiValued, RegistryKey, Scalar};

pub const LIST_DELIMITER: &str = "|";

/// One export row, aligned to a report's column list. Cells are plain text
/// and there is no way back to the multi-valued fields they came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FlatRecord {
    cells: Vec<String>,
}

impl FlatRecord {
    pub fn builder() -> FlatRecordBuilder {
        FlatRecordBuilder::default()
    }

    pub fn from_cells(cells: Vec<String>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct FlatRecordBuilder {
    cells: Vec<String>,
}

impl FlatRecordBuilder {
    pub fn text(mut self, value: impl Into<String>) -> Self {
        self.cells.push(value.into());
        self
    }

    pub fn scalar(self, value: &Scalar<String>) -> Self {
        let cell = value.get().cloned().unwrap_or_default();
        self.text(cell)
    }

    /// Two adjacent columns from a `(symbol, id)` style scalar.
    pub fn scalar_pair(self, value: &Scalar<(String, String)>) -> Self {
        match value.get() {
            Some((first, second)) => self.text(first.clone()).text(second.clone()),
            None => self.text("").text(""),
        }
    }

    pub fn list(self, values: &MultiValued<String>) -> Self {
        let cell = join_values(values);
        self.text(cell)
    }

    /// Two adjacent columns from paired values. Pairs are deduplicated and
    /// sorted as units so that the n-th entry of both columns belongs together.
    pub fn pairs(self, values: &MultiValued<(String, String)>) -> Self {
        let (first, second): (Vec<String>, Vec<String>) = values.normalized().into_iter().unzip();
        self.text(first.join(LIST_DELIMITER))
            .text(second.join(LIST_DELIMITER))
    }

    pub fn count(self, count: usize) -> Self {
        self.text(count.to_string())
    }

    pub fn flag(self, flag: bool, marker: &str) -> Self {
        self.text(if flag { marker } else { "" })
    }

    pub fn build(self) -> FlatRecord {
        FlatRecord { cells: self.cells }
    }
}

pub fn join_values(values: &MultiValued<String>) -> String {
    values.normalized().join(LIST_DELIMITER)
}

/// Implemented by entity records that end up in a report.
pub trait Flatten {
    fn flatten(&self) -> FlatRecord;
}

pub fn flatten_registry<K, R>(registry: &EntityRegistry<K, R>) -> Vec<FlatRecord>
where
    K: RegistryKey,
    R: Entity + Flatten,
{
    registry.values().map(Flatten::flatten).collect()
}

/// Sorts on the given columns, compared in order. Rows that tie on all of
/// them fall back to comparing every cell, so the result does not depend on
/// the order the rows arrived in.
pub fn sort_records(records: &mut [FlatRecord], columns: &[usize]) {
    records.sort_by(|left, right| {
        columns
            .iter()
            .map(|&index| left.cell(index).cmp(right.cell(index)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| left.cells().cmp(right.cells()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> MultiValued<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn list_is_distinct_sorted_and_joined() {
        assert_eq!(join_values(&strings(&["b", "a", "a", "c"])), "a|b|c");
        assert_eq!(join_values(&strings(&[])), "");
    }

    #[test]
    fn pairs_stay_aligned() {
        let pairs: MultiValued<(String, String)> = [
            ("w[1118]", "FBal0018186"),
            ("Act5C", "FBgn0000042"),
            ("w[1118]", "FBal0018186"),
        ]
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();
        let record = FlatRecord::builder().pairs(&pairs).build();
        assert_eq!(record.cells(), ["Act5C|w[1118]", "FBgn0000042|FBal0018186"]);
    }

    #[test]
    fn unset_scalars_are_empty() {
        let record = FlatRecord::builder()
            .scalar(&Scalar::default())
            .scalar_pair(&Scalar::default())
            .flag(false, "y")
            .count(0)
            .build();
        assert_eq!(record.cells(), ["", "", "", "", "0"]);
    }

    #[test]
    fn sort_uses_columns_in_order() {
        let mut records = vec![
            FlatRecord::from_cells(vec!["b".into(), "1".into()]),
            FlatRecord::from_cells(vec!["a".into(), "2".into()]),
            FlatRecord::from_cells(vec!["a".into(), "1".into()]),
        ];
        sort_records(&mut records, &[0, 1]);
        let firsts: Vec<_> = records.iter().map(|r| format!("{}{}", r.cell(0), r.cell(1))).collect();
        assert_eq!(firsts, ["a1", "a2", "b1"]);
    }

    #[test]
    fn ties_on_sort_columns_do_not_depend_on_input_order() {
        let first = FlatRecord::from_cells(vec!["FBgn1".into(), "2L".into(), "FBgn2".into()]);
        let second = FlatRecord::from_cells(vec!["FBgn1".into(), "2R".into(), "FBgn2".into()]);

        let mut forward = vec![first.clone(), second.clone()];
        let mut backward = vec![second, first];
        sort_records(&mut forward, &[0, 2]);
        sort_records(&mut backward, &[0, 2]);

        assert_eq!(forward, backward);
        assert_eq!(forward[0].cell(1), "2L");
    }
}
