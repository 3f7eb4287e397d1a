use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Identity key of a filter option. The backend is inconsistent about
/// whether ids come back as strings or numbers, so both forms are accepted
/// and compared through their string rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionKey {
    Text(String),
    Number(i64),
}

impl OptionKey {
    pub fn as_key(&self) -> String {
        match self {
            OptionKey::Text(s) => s.clone(),
            OptionKey::Number(n) => n.to_string(),
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKey::Text(s) => f.write_str(s),
            OptionKey::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for OptionKey {
    fn from(value: &str) -> Self {
        OptionKey::Text(value.to_string())
    }
}

/// One selectable entry in a filter dropdown. `id` and `value` are both
/// identity keys and must be treated as interchangeable; lookups try both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOption {
    pub id: OptionKey,
    pub name: String,
    pub value: OptionKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<OptionKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<OptionKey>,
}

impl FilterOption {
    /// True when `needle` matches this option's `id` or `value`, compared
    /// as strings.
    pub fn matches(&self, needle: &str) -> bool {
        self.id.as_key() == needle || self.value.as_key() == needle
    }

    /// Display name for an id drawn from `options`, falling back to the id
    /// itself when nothing matches.
    pub fn name_for<'a>(options: &'a [FilterOption], id: &'a str) -> &'a str {
        options
            .iter()
            .find(|opt| opt.matches(id))
            .map(|opt| opt.name.as_str())
            .unwrap_or(id)
    }
}
