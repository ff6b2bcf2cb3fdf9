use crate::core::value::{FieldValue, Value};
use serde::{Deserialize, Serialize};

static NULL_VALUE: Value = Value::Null;

/// One grouped, aggregated record returned by the source query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRow {
    /// Index of the result table the record belongs to.
    pub table: i64,
    pub field_values: Vec<FieldValue>,
}

impl SourceRow {
    pub fn new(table: i64, field_values: Vec<FieldValue>) -> Self {
        SourceRow {
            table,
            field_values,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.field_values.iter().find(|f| f.name == field)
    }

    /// Value of `field`, `None` when the field is absent from the record.
    /// A present field without a value reads as [`Value::Null`].
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.get(field)
            .map(|f| f.value.as_ref().unwrap_or(&NULL_VALUE))
    }

    pub fn len(&self) -> usize {
        self.field_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_values.is_empty()
    }
}

impl FromIterator<(String, Value)> for SourceRow {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        SourceRow::new(
            0,
            iter.into_iter()
                .map(|(name, value)| FieldValue::new(name, value))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_null_fields_differ() {
        let row = SourceRow::new(
            0,
            vec![
                FieldValue::new("company", Value::String("acme".into())),
                FieldValue {
                    name: "stage".into(),
                    value: None,
                },
            ],
        );

        assert_eq!(row.value("company"), Some(&Value::String("acme".into())));
        assert_eq!(row.value("stage"), Some(&Value::Null));
        assert_eq!(row.value("cohort"), None);
    }
}
