use std::collections::BTreeMap;

use super::error::Result;
use super::model::{Dataset, Record, Value};
use super::schema::{ColumnDef, ColumnType};

/// Two-way dictionary between a key domain and a code domain, such as US
/// state names and their FIPS codes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyMapping {
    forward: BTreeMap<Value, Value>,
    reverse: BTreeMap<Value, Value>,
}

impl KeyMapping {
    /// Build from `(key, code)` pairs. A repeated key or code keeps the
    /// last pair seen.
    pub fn new<I, K, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, C)>,
        K: Into<Value>,
        C: Into<Value>,
    {
        let mut mapping = KeyMapping::default();
        for (k, c) in pairs {
            let (k, c) = (k.into(), c.into());
            mapping.reverse.insert(c.clone(), k.clone());
            mapping.forward.insert(k, c);
        }
        mapping
    }

    pub fn forward(&self, key: &Value) -> Option<&Value> {
        self.forward.get(key)
    }

    pub fn reverse(&self, code: &Value) -> Option<&Value> {
        self.reverse.get(code)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// The fifty states keyed to their two-digit FIPS codes.
pub fn us_state_fips() -> KeyMapping {
    KeyMapping::new([
        ("Alabama", "01"), ("Alaska", "02"), ("Arizona", "04"), ("Arkansas", "05"),
        ("California", "06"), ("Colorado", "08"), ("Connecticut", "09"), ("Delaware", "10"),
        ("Florida", "12"), ("Georgia", "13"), ("Hawaii", "15"), ("Idaho", "16"),
        ("Illinois", "17"), ("Indiana", "18"), ("Iowa", "19"), ("Kansas", "20"),
        ("Kentucky", "21"), ("Louisiana", "22"), ("Maine", "23"), ("Maryland", "24"),
        ("Massachusetts", "25"), ("Michigan", "26"), ("Minnesota", "27"), ("Mississippi", "28"),
        ("Missouri", "29"), ("Montana", "30"), ("Nebraska", "31"), ("Nevada", "32"),
        ("New Hampshire", "33"), ("New Jersey", "34"), ("New Mexico", "35"), ("New York", "36"),
        ("North Carolina", "37"), ("North Dakota", "38"), ("Ohio", "39"), ("Oklahoma", "40"),
        ("Oregon", "41"), ("Pennsylvania", "42"), ("Rhode Island", "44"), ("South Carolina", "45"),
        ("South Dakota", "46"), ("Tennessee", "47"), ("Texas", "48"), ("Utah", "49"),
        ("Vermont", "50"), ("Virginia", "51"), ("Washington", "53"), ("West Virginia", "54"),
        ("Wisconsin", "55"), ("Wyoming", "56"),
    ])
}

/// Return a copy of `dataset` with a `target` column holding the mapped
/// value of `source` for each record, `Missing` where unmapped.
pub fn derive_column(
    dataset: &Dataset,
    source: &str,
    target: &str,
    kind: ColumnType,
    mapping: &KeyMapping,
) -> Result<Dataset> {
    let source_idx = dataset.schema().index_of(source)?;
    let schema = dataset
        .schema()
        .with_column(ColumnDef::new(target, kind).optional())?;

    let records = dataset
        .records()
        .iter()
        .map(|rec| {
            let mapped = mapping
                .forward(rec.get(source_idx))
                .and_then(|v| kind.coerce_value(v.clone()))
                .unwrap_or(Value::Missing);
            let mut values = rec.values().to_vec();
            values.push(mapped);
            Record::new(values)
        })
        .collect();

    Ok(Dataset::from_records(schema, records, dataset.report().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::LoadReport;
    use crate::data::schema::Schema;

    #[test]
    fn test_fips_round_trip() {
        let fips = us_state_fips();
        assert_eq!(fips.len(), 50);
        let code = fips.forward(&Value::from("Ohio")).unwrap();
        assert_eq!(code, &Value::from("39"));
        assert_eq!(fips.reverse(code), Some(&Value::from("Ohio")));
        assert_eq!(fips.reverse(&Value::from("11")), None);
    }

    #[test]
    fn test_derive_column_marks_unmapped_missing() {
        let schema = Schema::new(vec![
            ColumnDef::new("State", ColumnType::Text),
            ColumnDef::new("Value", ColumnType::Float),
        ])
        .unwrap();
        let ds = Dataset::from_records(
            schema,
            vec![
                Record::new(vec!["Texas".into(), Value::Float(1.0)]),
                Record::new(vec!["Puerto Rico".into(), Value::Float(2.0)]),
            ],
            LoadReport::default(),
        );
        let with_fips = derive_column(&ds, "State", "fips", ColumnType::Text, &us_state_fips()).unwrap();
        assert_eq!(with_fips.schema().len(), 3);
        assert_eq!(with_fips.records()[0].get(2), &Value::from("48"));
        assert_eq!(with_fips.records()[1].get(2), &Value::Missing);
        // source dataset untouched
        assert_eq!(ds.schema().len(), 2);
    }
}
