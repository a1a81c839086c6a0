use serde::de::{self, Deserializer};
use serde::{Deserialize, Serializer};

pub(crate) mod config;
pub(crate) mod item;
pub(crate) mod order;
pub(crate) mod product;

/// ids arrive either as JSON numbers or as numeric strings
pub(crate) fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i32),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid id {text:?}"))),
    }
}

/// render an id as a JSON string
pub(crate) fn serialize_id_str<S: Serializer>(id: &i32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}
