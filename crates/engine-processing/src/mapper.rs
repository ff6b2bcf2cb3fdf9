use model::{
    core::{
        dimension::{Dimension, DimensionKeys, MissingDimensionPolicy},
        value::Value,
    },
    records::{row::SourceRow, tuple::DestinationTuple},
};
use thiserror::Error;

/// Source column carrying the aggregated measure.
pub const MEASURE_FIELD: &str = "_value";

/// Why a source row could not become a destination tuple.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("Dimension {dimension} (source key `{key}`) is missing")]
    MissingDimension { dimension: Dimension, key: String },

    #[error("Dimension {dimension} (source key `{key}`) holds a {type_name} value that is not text")]
    NotText {
        dimension: Dimension,
        key: String,
        type_name: &'static str,
    },
}

/// Turns source rows into destination tuples. Pure: no I/O, no state.
#[derive(Debug, Clone, Default)]
pub struct RowMapper {
    keys: DimensionKeys,
    missing: MissingDimensionPolicy,
}

impl RowMapper {
    pub fn new(keys: DimensionKeys, missing: MissingDimensionPolicy) -> Self {
        Self { keys, missing }
    }

    pub fn map(&self, row: &SourceRow) -> Result<DestinationTuple, MappingError> {
        Ok(DestinationTuple {
            company: self.dimension(row, Dimension::Company)?,
            project: self.dimension(row, Dimension::Project)?,
            cohort: self.dimension(row, Dimension::Cohort)?,
            user: self.dimension(row, Dimension::User)?,
            stage: self.dimension(row, Dimension::Stage)?,
            version_tag: self.dimension(row, Dimension::VersionTag)?,
            value: measure(row),
        })
    }

    fn dimension(&self, row: &SourceRow, dimension: Dimension) -> Result<String, MappingError> {
        let key = self.keys.key(dimension);

        match row.value(key) {
            None | Some(Value::Null) => match self.missing {
                MissingDimensionPolicy::Empty => Ok(String::new()),
                MissingDimensionPolicy::Skip => Err(MappingError::MissingDimension {
                    dimension,
                    key: key.to_string(),
                }),
            },
            Some(value) => value.as_text().ok_or_else(|| MappingError::NotText {
                dimension,
                key: key.to_string(),
                type_name: value.type_name(),
            }),
        }
    }
}

/// Numeric measure or `0.0`. Non-numeric, absent and non-finite values all
/// coerce to zero; they never reject the row.
fn measure(row: &SourceRow) -> f64 {
    row.value(MEASURE_FIELD)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(fields: Vec<(&str, Value)>) -> SourceRow {
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn complete(value: Value) -> SourceRow {
        row(vec![
            ("company", Value::String("acme".into())),
            ("project", Value::String("apollo".into())),
            ("cohort", Value::String("q1".into())),
            ("user", Value::String("alice".into())),
            ("stage", Value::String("build".into())),
            ("java", Value::String("17".into())),
            (MEASURE_FIELD, value),
        ])
    }

    #[test]
    fn maps_complete_row() {
        let tuple = RowMapper::default().map(&complete(Value::Float(12.5))).unwrap();
        assert_eq!(tuple.key(), ["acme", "apollo", "q1", "alice", "build", "17"]);
        assert_eq!(tuple.value, 12.5);
    }

    #[test]
    fn non_string_dimensions_render_as_text() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut source = complete(Value::Int(3));
        source.field_values[2].value = Some(Value::Timestamp(ts));
        source.field_values[5].value = Some(Value::Int(21));

        let tuple = RowMapper::default().map(&source).unwrap();
        assert_eq!(tuple.cohort, "2024-03-01T12:00:00Z");
        assert_eq!(tuple.version_tag, "21");
        assert_eq!(tuple.value, 3.0);
    }

    #[test]
    fn non_numeric_measure_becomes_zero() {
        let mapper = RowMapper::default();
        for value in [
            Value::String("N/A".into()),
            Value::String("42".into()),
            Value::Null,
            Value::Float(f64::NAN),
            Value::Float(f64::INFINITY),
        ] {
            assert_eq!(mapper.map(&complete(value)).unwrap().value, 0.0);
        }

        let mut absent = complete(Value::Null);
        absent.field_values.pop();
        assert_eq!(mapper.map(&absent).unwrap().value, 0.0);
    }

    #[test]
    fn missing_dimension_follows_policy() {
        let mut source = complete(Value::Float(1.0));
        source.field_values.retain(|f| f.name != "stage");
        source.field_values[0].value = None;

        let tuple = RowMapper::default().map(&source).unwrap();
        assert_eq!(tuple.company, "");
        assert_eq!(tuple.stage, "");

        let strict = RowMapper::new(DimensionKeys::default(), MissingDimensionPolicy::Skip);
        assert_eq!(
            strict.map(&source),
            Err(MappingError::MissingDimension {
                dimension: Dimension::Company,
                key: "company".into(),
            })
        );
    }

    #[test]
    fn binary_dimension_is_rejected() {
        let mut source = complete(Value::Float(1.0));
        source.field_values[3].value = Some(Value::Bytes(vec![0xff, 0xfe]));

        match RowMapper::default().map(&source) {
            Err(MappingError::NotText { dimension, .. }) => assert_eq!(dimension, Dimension::User),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn version_tag_key_is_configurable() {
        let source = row(vec![
            ("company", Value::String("acme".into())),
            ("project", Value::String("apollo".into())),
            ("cohort", Value::String("q1".into())),
            ("user", Value::String("alice".into())),
            ("stage", Value::String("build".into())),
            ("runtime", Value::String("jdk21".into())),
            ("java", Value::String("ignored".into())),
            (MEASURE_FIELD, Value::Uint(7)),
        ]);
        let mapper = RowMapper::new(DimensionKeys::new("runtime"), MissingDimensionPolicy::Empty);
        let tuple = mapper.map(&source).unwrap();
        assert_eq!(tuple.version_tag, "jdk21");
        assert_eq!(tuple.value, 7.0);
    }
}
