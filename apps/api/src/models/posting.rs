use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;

/// A job posting captured from the job-board site, stored as-is.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PostingRow {
    pub id: String,
    pub data: Value,
    pub saved_at: DateTime<Utc>,
}

/// Listing projection: the handful of fields the extension shows in lists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingSummary {
    pub id: String,
    pub name: Option<String>,
    pub employer: Option<String>,
    pub area: Option<String>,
    pub salary: Option<Value>,
    pub published_at: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl PostingSummary {
    pub fn from_row(row: &PostingRow) -> Self {
        let data = &row.data;
        PostingSummary {
            id: row.id.clone(),
            name: string_field(data, &["name"]),
            employer: string_field(data, &["employer", "name"]),
            area: string_field(data, &["area", "name"]),
            salary: data.get("salary").filter(|v| !v.is_null()).cloned(),
            published_at: string_field(data, &["published_at"]),
            saved_at: row.saved_at,
        }
    }
}

fn string_field(data: &Value, path: &[&str]) -> Option<String> {
    let mut current = data;
    for key in path {
        current = current.get(key)?;
    }
    current.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_projects_nested_fields() {
        let row = PostingRow {
            id: "123".to_string(),
            data: serde_json::json!({
                "name": "Rust Engineer",
                "employer": {"name": "Acme"},
                "area": {"name": "Berlin"},
                "salary": {"from": 70000, "currency": "EUR"},
                "published_at": "2025-11-02T10:00:00+0300"
            }),
            saved_at: Utc::now(),
        };

        let summary = PostingSummary::from_row(&row);
        assert_eq!(summary.name.as_deref(), Some("Rust Engineer"));
        assert_eq!(summary.employer.as_deref(), Some("Acme"));
        assert_eq!(summary.area.as_deref(), Some("Berlin"));
        assert!(summary.salary.is_some());
    }

    #[test]
    fn summary_tolerates_sparse_postings() {
        let row = PostingRow {
            id: "456".to_string(),
            data: serde_json::json!({"salary": null}),
            saved_at: Utc::now(),
        };

        let summary = PostingSummary::from_row(&row);
        assert!(summary.name.is_none());
        assert!(summary.employer.is_none());
        assert!(summary.salary.is_none());
    }
}
