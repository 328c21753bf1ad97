use serde::{Deserialize, Deserializer};

/// Distinguish "field absent" (`None`) from "field set to null" (`Some(None)`)
/// in partial updates. Use together with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}
