//! Authenticated identity types.

use serde::{Deserialize, Deserializer, Serialize};

/// The identity derived from a bearer credential.
///
/// Created once per request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject_id: i64,
    pub display_name: String,
    pub tenant_id: Option<i64>,
    pub profile_id: Option<i64>,
}

/// Identifiers arrive as JSON numbers or as numeric strings depending on the
/// issuer (`sub` is a string in standard JWTs).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    fn into_id<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            RawId::Number(n) => Ok(n),
            RawId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid numeric id `{s}`"))),
        }
    }
}

pub(crate) fn numeric_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer)?.into_id()
}

pub(crate) fn optional_numeric_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawId>::deserialize(deserializer)? {
        Some(raw) => raw.into_id().map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Ids {
        #[serde(deserialize_with = "numeric_id")]
        id: i64,
        #[serde(default, deserialize_with = "optional_numeric_id")]
        tenant: Option<i64>,
    }

    #[test]
    fn test_numeric_ids_accept_numbers_and_strings() {
        let ids: Ids = serde_json::from_str(r#"{"id": 7, "tenant": "42"}"#).unwrap();
        assert_eq!(ids.id, 7);
        assert_eq!(ids.tenant, Some(42));

        let ids: Ids = serde_json::from_str(r#"{"id": "9", "tenant": null}"#).unwrap();
        assert_eq!(ids.id, 9);
        assert_eq!(ids.tenant, None);

        let ids: Ids = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert_eq!(ids.tenant, None);
    }

    #[test]
    fn test_non_numeric_id_is_rejected() {
        assert!(serde_json::from_str::<Ids>(r#"{"id": "abc"}"#).is_err());
    }
}
