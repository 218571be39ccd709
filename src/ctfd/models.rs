use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

/// Shown when the platform does not expose who solved a challenge
pub const UNKNOWN_SOLVER: &str = "Inconnue";

/// CTFd wraps every payload as `{ "success": true, "data": ... }`.
/// Items are kept raw so that one malformed entry never hides the others.
#[derive(Deserialize, Debug, Default)]
pub(crate) struct ApiResponse {
    #[serde(default)]
    pub data: Vec<Value>,
}

impl ApiResponse {
    /// Decodes every item that matches `T`, logging and dropping the rest
    pub fn items<T: DeserializeOwned>(self) -> Vec<T> {
        self.data
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value::<T>(item) {
                Ok(decoded) => Some(decoded),
                Err(err) => {
                    tracing::warn!(index, "skipping malformed item: {err}");
                    None
                }
            })
            .collect()
    }

    /// Decodes items in order up to the first one that does not match `T`.
    ///
    /// Used where position matters: dropping an entry from the middle would
    /// shift every later entry up by one.
    pub fn leading_items<T: DeserializeOwned>(self) -> Vec<T> {
        let mut decoded = Vec::with_capacity(self.data.len());
        for (index, item) in self.data.into_iter().enumerate() {
            match serde_json::from_value::<T>(item) {
                Ok(value) => decoded.push(value),
                Err(err) => {
                    tracing::warn!(index, "ignoring malformed item and everything after it: {err}");
                    break;
                }
            }
        }
        decoded
    }
}

/// Item of `GET /api/v1/challenges`
/// `{ "id": 1, "name": "Crypto1", "value": 100, "category": "crypto", ... }`
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub id: u64,
    pub name: String,
}

/// Item of `GET /api/v1/challenges/{id}/solves`
/// `{ "account_id": 3, "name": "TeamA", "date": "2024-01-01T10:00:00.000000Z", ... }`
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Solve {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl Solve {
    pub fn solver(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_SOLVER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_challenge_list_ignores_extra_fields() {
        let body = r#"{"success": true, "data": [
            {"id": 1, "name": "Crypto1", "value": 100, "category": "crypto", "type": "standard"},
            {"id": 2, "name": "Web1", "value": 50, "solves": 3}
        ]}"#;

        let response: ApiResponse = serde_json::from_str(body).unwrap();

        assert_eq!(
            response.items::<Challenge>(),
            vec![
                Challenge { id: 1, name: "Crypto1".to_string() },
                Challenge { id: 2, name: "Web1".to_string() },
            ]
        );
    }

    #[test]
    fn test_missing_data_is_empty() {
        let response: ApiResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();

        assert!(response.items::<Challenge>().is_empty());
    }

    #[test]
    fn test_solve_without_name_uses_placeholder() {
        let response: ApiResponse =
            serde_json::from_str(r#"{"data": [{"name": null, "date": "2024-01-01T10:00:00.000000Z"}]}"#)
                .unwrap();
        let solves = response.leading_items::<Solve>();

        assert_eq!(solves[0].solver(), UNKNOWN_SOLVER);
        assert_eq!(
            solves[0].date.as_deref(),
            Some("2024-01-01T10:00:00.000000Z")
        );
    }

    #[test]
    fn test_malformed_challenge_does_not_hide_the_others() {
        let response: ApiResponse = serde_json::from_str(
            r#"{"data": [
                {"id": "one", "name": "Broken"},
                {"id": 1, "name": "Crypto1"},
                {"id": 2},
                {"id": 3, "name": "Web1"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            response.items::<Challenge>(),
            vec![
                Challenge { id: 1, name: "Crypto1".to_string() },
                Challenge { id: 3, name: "Web1".to_string() },
            ]
        );
    }

    #[test]
    fn test_malformed_later_solve_keeps_the_first() {
        let response: ApiResponse = serde_json::from_str(
            r#"{"data": [
                {"name": "TeamA", "date": "2024-01-01T10:00:00.000000Z"},
                {"name": 42, "date": "2024-01-01T10:05:00.000000Z"},
                {"name": "TeamC", "date": "2024-01-01T10:10:00.000000Z"}
            ]}"#,
        )
        .unwrap();

        let solves = response.leading_items::<Solve>();

        assert_eq!(solves.len(), 1);
        assert_eq!(solves[0].solver(), "TeamA");
    }

    #[test]
    fn test_malformed_first_solve_is_never_replaced_by_the_second() {
        let response: ApiResponse = serde_json::from_str(
            r#"{"data": [
                {"name": ["TeamA"], "date": "2024-01-01T10:00:00.000000Z"},
                {"name": "TeamB", "date": "2024-01-01T10:05:00.000000Z"}
            ]}"#,
        )
        .unwrap();

        assert!(response.leading_items::<Solve>().is_empty());
    }
}
