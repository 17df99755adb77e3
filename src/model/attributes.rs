//! AttributeMap: the key-value store on nodes and edges.

use std::collections::HashMap;

use super::Value;

/// A map of attribute names to values.
pub type AttributeMap = HashMap<String, Value>;

/// Build an [`AttributeMap`] from `(key, value)` pairs.
pub fn attribute_map<I, K, V>(pairs: I) -> AttributeMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Every `(key, value)` of `required` is present in `attributes` with the
/// same text form.
pub fn matches_text(attributes: &AttributeMap, required: &AttributeMap) -> bool {
    required.iter().all(|(key, want)| {
        attributes.get(key).is_some_and(|have| have.to_text() == want.to_text())
    })
}
