//! Embedding store: best-effort writer for the semantic-similarity side
//! channel.
//!
//! Embeddings never gate the primary operation: any failure here is logged at
//! warn and swallowed. The vector column is written through a raw-SQL
//! `::vector` cast because the typed query layer does not model pgvector.

use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::provider::Provider;

/// Record owning an embedding. The vector is a nullable side-attribute,
/// attached after the owning row exists.
#[derive(Debug, Clone)]
pub enum EmbeddingOwner {
    CoverLetter(Uuid),
    ResumeAnalysis(Uuid),
    Posting(String),
    PostingAnalysis(Uuid),
}

impl EmbeddingOwner {
    fn describe(&self) -> String {
        match self {
            EmbeddingOwner::CoverLetter(id) => format!("cover letter {id}"),
            EmbeddingOwner::ResumeAnalysis(id) => format!("resume analysis {id}"),
            EmbeddingOwner::Posting(id) => format!("posting {id}"),
            EmbeddingOwner::PostingAnalysis(id) => format!("posting analysis {id}"),
        }
    }
}

/// Embeds `text` and attaches the vector to `owner`. Best-effort: provider
/// and store failures are logged and never reach the caller.
pub async fn store_embedding(
    pool: &PgPool,
    provider: &dyn Provider,
    owner: EmbeddingOwner,
    text: &str,
) {
    if text.is_empty() {
        return;
    }

    let vector = match provider.generate_embedding(text).await {
        Ok(vector) => vector,
        Err(e) => {
            warn!("Failed to generate embedding for {}: {e}", owner.describe());
            return;
        }
    };

    if let Err(e) = attach(pool, &owner, &vector).await {
        warn!("Failed to store embedding for {}: {e}", owner.describe());
    }
}

async fn attach(pool: &PgPool, owner: &EmbeddingOwner, vector: &[f32]) -> Result<(), sqlx::Error> {
    let literal = vector_literal(vector);
    let query = match owner {
        EmbeddingOwner::CoverLetter(id) => {
            sqlx::query("UPDATE cover_letters SET embedding = $1::vector WHERE id = $2")
                .bind(literal)
                .bind(id)
        }
        EmbeddingOwner::ResumeAnalysis(id) => {
            sqlx::query("UPDATE resume_analyses SET embedding = $1::vector WHERE id = $2")
                .bind(literal)
                .bind(id)
        }
        EmbeddingOwner::Posting(id) => {
            sqlx::query("UPDATE postings SET embedding = $1::vector WHERE id = $2")
                .bind(literal)
                .bind(id)
        }
        EmbeddingOwner::PostingAnalysis(id) => {
            sqlx::query("UPDATE posting_analyses SET embedding = $1::vector WHERE id = $2")
                .bind(literal)
                .bind(id)
        }
    };

    query.execute(pool).await.map(|_| ())
}

/// Renders the pgvector input literal. Non-finite components are zeroed
/// rather than rejected.
fn vector_literal(vector: &[f32]) -> String {
    let parts: Vec<String> = vector
        .iter()
        .map(|v| {
            if v.is_finite() {
                v.to_string()
            } else {
                "0".to_string()
            }
        })
        .collect();
    format!("[{}]", parts.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_bracketed_literal() {
        assert_eq!(vector_literal(&[0.5, -1.0, 2.25]), "[0.5,-1,2.25]");
        assert_eq!(vector_literal(&[]), "[]");
    }

    #[test]
    fn zeroes_non_finite_components() {
        assert_eq!(
            vector_literal(&[f32::NAN, f32::INFINITY, 1.0]),
            "[0,0,1]"
        );
    }

    #[test]
    fn owner_description_names_the_record() {
        let id = Uuid::new_v4();
        assert!(EmbeddingOwner::CoverLetter(id).describe().contains("cover letter"));
        assert!(EmbeddingOwner::Posting("123".to_string())
            .describe()
            .contains("123"));
    }
}
