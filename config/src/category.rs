use serde::{
    Deserialize,
    Serialize,
};
use strum::{
    Display,
    EnumIter,
    EnumString,
    IntoEnumIterator as _,
};

/// A statistics category exposed by the node stats API.
///
/// The lowercase name doubles as the URL path segment requested from the
/// monitored node (`/_node/stats/jvm,process,...`).
#[derive(Debug, Clone, Copy, Display, EnumIter, EnumString, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Jvm,
    Process,
    Events,
    Pipeline,
}

impl Category {
    pub fn all() -> Vec<Category> {
        Category::iter().collect()
    }

    /// Comma-joined path segment for a set of categories.
    pub fn join(categories: &[Category]) -> String {
        categories.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
    }
}
