use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Structured résumé data extracted by the model.
///
/// Field names follow the JSON schema the analysis prompts instruct the model
/// to produce, so everything is camelCase on the wire. Section arrays default
/// to empty: the prompts tell the model to emit `[]` for absent sections, but
/// older outputs omit them entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeAnalysisResult {
    pub personal_info: PersonalInfo,
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default)]
    pub experience: Vec<WorkExperience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub tests: Vec<TestEntry>,
    #[serde(default)]
    pub certificates: Vec<Certificate>,
    #[serde(default)]
    pub additional_info: AdditionalInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkExperience {
    pub company: String,
    pub position: String,
    pub period: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Education {
    pub institution: String,
    pub degree: String,
    pub period: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    pub language: String,
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub name: String,
    pub institution: String,
    pub period: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A passed test or exam (the "tests" section of the résumé).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    pub period: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    pub name: String,
    pub issuer: String,
    pub period: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdditionalInfo {
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<String>,
}

/// Persisted résumé analysis, upserted by résumé id.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ResumeAnalysisRow {
    pub id: Uuid,
    pub resume_id: String,
    pub analysis: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_model_output() {
        let json = serde_json::json!({
            "personalInfo": {
                "fullName": "Jane Doe",
                "email": "jane@example.com",
                "location": "Berlin"
            },
            "position": "Backend Engineer",
            "about": "Rust and distributed systems.",
            "experience": [
                {
                    "company": "Acme",
                    "position": "Engineer",
                    "period": "2020-2024",
                    "description": "Built services."
                }
            ],
            "education": [],
            "skills": [{"name": "Rust", "level": "advanced", "verified": true}],
            "languages": [{"language": "English", "level": "C1"}],
            "courses": [],
            "tests": [],
            "certificates": [],
            "additionalInfo": {"projects": ["side project"]}
        });

        let result: ResumeAnalysisResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.personal_info.full_name, "Jane Doe");
        assert_eq!(result.position, "Backend Engineer");
        assert_eq!(result.experience.len(), 1);
        assert_eq!(result.skills[0].verified, Some(true));
        assert_eq!(result.additional_info.projects, vec!["side project"]);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let json = serde_json::json!({
            "personalInfo": {"fullName": "Jane Doe"},
            "position": "Engineer"
        });

        let result: ResumeAnalysisResult = serde_json::from_value(json).unwrap();
        assert!(result.experience.is_empty());
        assert!(result.tests.is_empty());
        assert!(result.about.is_none());
        assert!(result.additional_info.other.is_none());
    }
}
