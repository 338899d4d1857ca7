pub mod admin;
pub mod auth;
pub mod push;
pub mod reply;
pub mod sessions;
pub mod status;

use serde::{Deserialize, Deserializer};

use crate::error::ApiError;

/// Required body or query field; absent values become a field-level 400.
pub(crate) fn require<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::field(field, format!("{} is required", field)))
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use uuid::Uuid;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        team_id: Option<Option<Uuid>>,
    }

    #[test]
    fn null_and_absent_differ() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.team_id, None);

        let cleared: Patch = serde_json::from_str(r#"{"team_id": null}"#).unwrap();
        assert_eq!(cleared.team_id, Some(None));

        let id = Uuid::new_v4();
        let set: Patch = serde_json::from_str(&format!(r#"{{"team_id": "{}"}}"#, id)).unwrap();
        assert_eq!(set.team_id, Some(Some(id)));
    }
}
