//! Serde helpers for human readable durations (`"5s"`, `"1m 30s"`).

use serde::{
    de::Error as _,
    Deserialize,
    Deserializer,
    Serializer,
};
use std::time::Duration;

pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(|e| D::Error::custom(format!("invalid duration '{raw}': {e}")))
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => super::serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => humantime::parse_duration(raw)
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid duration '{raw}': {e}"))),
        }
    }
}
