use serde::{Deserialize, Serialize};
use sheetsync_core::SheetGrid;

// ─── Values API ───────────────────────────────────────────────────────────

/// Request body for `spreadsheets.values.update`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange<'a> {
    pub range: &'a str,
    pub major_dimension: &'static str,
    pub values: &'a SheetGrid,
}

impl<'a> ValueRange<'a> {
    pub fn rows(range: &'a str, values: &'a SheetGrid) -> Self {
        Self {
            range,
            major_dimension: "ROWS",
            values,
        }
    }
}

/// Response of `spreadsheets.values.update`. Every field is optional: the
/// API omits counts that are zero.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: Option<u64>,
    #[serde(default)]
    pub updated_columns: Option<u64>,
    #[serde(default)]
    pub updated_cells: Option<u64>,
}

/// Google's JSON error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Pull a readable message out of an error response body.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => match parsed.error.status {
            Some(status) => format!("{status}: {}", parsed.error.message),
            None => parsed.error.message,
        },
        Err(_) => body.chars().take(300).collect(),
    }
}

// ─── OAuth ────────────────────────────────────────────────────────────────

/// JWT claim set for the service-account bearer grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

/// Token endpoint error shape: `{"error": "...", "error_description": "..."}`.
#[derive(Debug, Deserialize)]
pub struct TokenErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sheetsync_core::Record;

    #[test]
    fn value_range_serializes_camel_case() {
        let grid = SheetGrid::from_records(&[Record::new().with("id", 1)]);
        let body = serde_json::to_value(ValueRange::rows("users!A1", &grid)).unwrap();
        assert_eq!(
            body,
            json!({"range": "users!A1", "majorDimension": "ROWS", "values": [["id"], [1]]})
        );
    }

    #[test]
    fn update_response_tolerates_missing_counts() {
        let resp: UpdateValuesResponse =
            serde_json::from_str(r#"{"spreadsheetId":"s","updatedRange":"users!A1:B3"}"#).unwrap();
        assert_eq!(resp.updated_range.as_deref(), Some("users!A1:B3"));
        assert_eq!(resp.updated_cells, None);
    }

    #[test]
    fn error_message_prefers_google_envelope() {
        let body = r#"{"error":{"code":400,"message":"Unable to parse range: nope!A1","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            error_message(body),
            "INVALID_ARGUMENT: Unable to parse range: nope!A1"
        );
    }

    #[test]
    fn error_message_falls_back_to_raw_text() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
