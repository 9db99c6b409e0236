//! JSON-backed column types shared by several entities.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered list of strings stored as a JSON array (image paths, feature bullets).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct StringList(pub Vec<String>);

impl From<Vec<String>> for StringList {
    fn from(items: Vec<String>) -> Self {
        Self(items)
    }
}

/// Free-form key/value attributes stored as a JSON object (e.g. `size = "M"`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct AttributeMap(pub BTreeMap<String, String>);

impl From<BTreeMap<String, String>> for AttributeMap {
    fn from(attributes: BTreeMap<String, String>) -> Self {
        Self(attributes)
    }
}
