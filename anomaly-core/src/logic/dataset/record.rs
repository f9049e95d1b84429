use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One CSV row: `timestamp,value`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Sample {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub value: f32,
}

/// A named univariate timeseries
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub samples: Vec<Sample>,
}

/// Shape and basic statistics of a series
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SeriesSummary {
    pub name: String,
    pub count: usize,
    pub mean: f32,
    pub std: f32,
    pub min: f32,
    pub max: f32,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
}

impl Series {
    pub fn new(name: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn values(&self) -> Vec<f32> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn timestamp_at(&self, index: usize) -> Option<NaiveDateTime> {
        self.samples.get(index).map(|s| s.timestamp)
    }

    pub fn describe(&self) -> SeriesSummary {
        let n = self.samples.len();
        let (mean, std) = crate::logic::features::mean_std(&self.values());

        let (min, max) = self.samples.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(lo, hi), s| (lo.min(s.value), hi.max(s.value)),
        );

        SeriesSummary {
            name: self.name.clone(),
            count: n,
            mean,
            std,
            min: if self.is_empty() { 0.0 } else { min },
            max: if self.is_empty() { 0.0 } else { max },
            first: self.samples.first().map(|s| s.timestamp),
            last: self.samples.last().map(|s| s.timestamp),
        }
    }
}

/// serde adapter for the NAB timestamp layout
pub(crate) mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    use crate::constants::TIMESTAMP_FORMAT;

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
