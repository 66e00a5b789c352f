//! Request body parameters and their encodings

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::error::Result;

/// Body parameters accepted by `post`, `put` and `delete`
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    #[default]
    Empty,
    /// Ordered key/value pairs
    Form(Vec<(String, String)>),
    /// A pre-encoded body, sent verbatim
    Raw(String),
    /// A JSON document
    Json(Value),
}

impl Params {
    pub fn form<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Params::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Params::Json(serde_json::to_value(value)?))
    }

    /// Encode as a form body, or as JSON when `as_json` is set.
    ///
    /// Pairs keep their insertion order either way. An empty parameter
    /// set becomes an empty form body or the JSON array `[]`.
    pub fn encode(&self, as_json: bool) -> Result<String> {
        if as_json {
            let body = match self {
                Params::Empty => "[]".to_string(),
                Params::Form(pairs) => serde_json::to_string(&OrderedPairs(pairs))?,
                Params::Raw(raw) => serde_json::to_string(raw)?,
                Params::Json(value) => serde_json::to_string(value)?,
            };
            return Ok(body);
        }

        let body = match self {
            Params::Empty => String::new(),
            Params::Form(pairs) => encode_pairs(pairs),
            Params::Raw(raw) => raw.clone(),
            Params::Json(value) => serde_json::to_string(value)?,
        };
        Ok(body)
    }
}

/// `application/x-www-form-urlencoded` serialization joined with `&`
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}

struct OrderedPairs<'a>(&'a [(String, String)]);

impl Serialize for OrderedPairs<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl From<&str> for Params {
    fn from(value: &str) -> Self {
        Params::Raw(value.to_string())
    }
}

impl From<String> for Params {
    fn from(value: String) -> Self {
        Params::Raw(value)
    }
}

impl From<Value> for Params {
    fn from(value: Value) -> Self {
        Params::Json(value)
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for Params {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Params::form(pairs)
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Params {
    fn from(pairs: [(K, V); N]) -> Self {
        Params::form(pairs)
    }
}
