use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Model verdict on whether the posting is worth applying to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Apply,
    Caution,
    Avoid,
}

impl Recommendation {
    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::Apply => "apply",
            Recommendation::Caution => "caution",
            Recommendation::Avoid => "avoid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "apply" => Some(Recommendation::Apply),
            "caution" => Some(Recommendation::Caution),
            "avoid" => Some(Recommendation::Avoid),
            _ => None,
        }
    }
}

/// How the advertised salary compares to the role, as judged by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryAdequacy {
    Adequate,
    Low,
    High,
    NotSpecified,
}

impl SalaryAdequacy {
    pub fn as_str(self) -> &'static str {
        match self {
            SalaryAdequacy::Adequate => "adequate",
            SalaryAdequacy::Low => "low",
            SalaryAdequacy::High => "high",
            SalaryAdequacy::NotSpecified => "not_specified",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "adequate" => Some(SalaryAdequacy::Adequate),
            "low" => Some(SalaryAdequacy::Low),
            "high" => Some(SalaryAdequacy::High),
            "not_specified" => Some(SalaryAdequacy::NotSpecified),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceMatch {
    JuniorFriendly,
    RequiresExperience,
    Unrealistic,
}

impl ExperienceMatch {
    pub fn as_str(self) -> &'static str {
        match self {
            ExperienceMatch::JuniorFriendly => "junior_friendly",
            ExperienceMatch::RequiresExperience => "requires_experience",
            ExperienceMatch::Unrealistic => "unrealistic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "junior_friendly" => Some(ExperienceMatch::JuniorFriendly),
            "requires_experience" => Some(ExperienceMatch::RequiresExperience),
            "unrealistic" => Some(ExperienceMatch::Unrealistic),
            _ => None,
        }
    }
}

/// A validated toxicity/risk assessment of one job posting.
///
/// Instances only exist after model output has passed validation; the raw
/// response never reaches storage or callers in unvalidated form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingAnalysis {
    /// 1 (benign) to 10 (run away).
    pub toxicity_score: i32,
    pub recommendation: Recommendation,
    pub red_flags: Vec<String>,
    pub positives: Vec<String>,
    pub summary: String,
    pub salary_adequacy: SalaryAdequacy,
    pub experience_match: ExperienceMatch,
}

/// A persisted posting analysis. Historical rows may exist per posting;
/// lookups always select the newest one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingAnalysisRecord {
    pub id: Uuid,
    pub posting_id: String,
    #[serde(flatten)]
    pub analysis: PostingAnalysis,
    pub analyzed_at: DateTime<Utc>,
}

/// Raw database row; enum columns are stored as text and decoded on read.
/// The raw response envelope stays in the table (for replay) but is not
/// selected on the hot path.
#[derive(Debug, Clone, FromRow)]
pub struct PostingAnalysisRow {
    pub id: Uuid,
    pub posting_id: String,
    pub toxicity_score: i32,
    pub recommendation: String,
    pub red_flags: Vec<String>,
    pub positives: Vec<String>,
    pub summary: String,
    pub salary_adequacy: String,
    pub experience_match: String,
    pub analyzed_at: DateTime<Utc>,
}

impl TryFrom<PostingAnalysisRow> for PostingAnalysisRecord {
    type Error = String;

    fn try_from(row: PostingAnalysisRow) -> Result<Self, Self::Error> {
        let recommendation = Recommendation::parse(&row.recommendation)
            .ok_or_else(|| format!("unknown recommendation \"{}\"", row.recommendation))?;
        let salary_adequacy = SalaryAdequacy::parse(&row.salary_adequacy)
            .ok_or_else(|| format!("unknown salary adequacy \"{}\"", row.salary_adequacy))?;
        let experience_match = ExperienceMatch::parse(&row.experience_match)
            .ok_or_else(|| format!("unknown experience match \"{}\"", row.experience_match))?;

        Ok(PostingAnalysisRecord {
            id: row.id,
            posting_id: row.posting_id,
            analysis: PostingAnalysis {
                toxicity_score: row.toxicity_score,
                recommendation,
                red_flags: row.red_flags,
                positives: row.positives,
                summary: row.summary,
                salary_adequacy,
                experience_match,
            },
            analyzed_at: row.analyzed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> PostingAnalysisRow {
        PostingAnalysisRow {
            id: Uuid::new_v4(),
            posting_id: "123".to_string(),
            toxicity_score: 4,
            recommendation: "caution".to_string(),
            red_flags: vec!["unpaid overtime".to_string()],
            positives: vec!["modern stack".to_string()],
            summary: "Decent role with some warning signs.".to_string(),
            salary_adequacy: "low".to_string(),
            experience_match: "requires_experience".to_string(),
            analyzed_at: Utc::now(),
        }
    }

    #[test]
    fn enums_round_trip_through_serde() {
        let json = serde_json::to_string(&Recommendation::Caution).unwrap();
        assert_eq!(json, "\"caution\"");
        let back: Recommendation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Recommendation::Caution);

        let json = serde_json::to_string(&SalaryAdequacy::NotSpecified).unwrap();
        assert_eq!(json, "\"not_specified\"");
        let json = serde_json::to_string(&ExperienceMatch::JuniorFriendly).unwrap();
        assert_eq!(json, "\"junior_friendly\"");
    }

    #[test]
    fn row_decodes_into_record() {
        let record = PostingAnalysisRecord::try_from(sample_row()).unwrap();
        assert_eq!(record.analysis.recommendation, Recommendation::Caution);
        assert_eq!(record.analysis.salary_adequacy, SalaryAdequacy::Low);
        assert_eq!(record.analysis.toxicity_score, 4);
    }

    #[test]
    fn row_with_unknown_recommendation_fails_decode() {
        let mut row = sample_row();
        row.recommendation = "maybe".to_string();
        let err = PostingAnalysisRecord::try_from(row).unwrap_err();
        assert!(err.contains("maybe"));
    }

    #[test]
    fn record_serializes_flat_camel_case() {
        let record = PostingAnalysisRecord::try_from(sample_row()).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["toxicityScore"], 4);
        assert_eq!(value["recommendation"], "caution");
        assert_eq!(value["postingId"], "123");
    }
}
