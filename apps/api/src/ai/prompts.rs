// All LLM prompt constants for the generation service.
// System prompts are per task; user prompts are rendered by pure builders
// that never mutate their inputs.

use serde_json::Value;

use crate::models::analysis::PostingAnalysis;

/// System prompt for cover-letter generation.
pub const COVER_LETTER_SYSTEM: &str = "You write short cover letters. \
    Write like a real person - natural but professional. \
    Avoid templates and formalities. \
    Focus on concrete technologies and experience.";

/// System prompt for HTML résumé analysis. Enforces JSON-only output.
pub const RESUME_ANALYSIS_SYSTEM: &str = "You are an expert resume analyst. \
    Extract only facts from the HTML, add nothing of your own. \
    Respond with valid JSON only.";

/// System prompt for plain-text résumé analysis.
pub const RESUME_TEXT_ANALYSIS_SYSTEM: &str = "You are an expert resume analyst. \
    Extract only facts from the text, add nothing of your own. \
    Respond with valid JSON only.";

/// System prompt for posting toxicity analysis. Enforces JSON-only output.
pub const POSTING_ANALYSIS_SYSTEM: &str = "You are an expert on workplace culture \
    and job-market red flags. Judge the posting strictly from its own text. \
    Respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Cover-letter prompt template.
/// Replace: {resume_json}, {posting_json}.
const COVER_LETTER_TEMPLATE: &str = r#"Write a short cover letter based on the resume and the job posting.

RESUME:
{resume_json}

JOB POSTING:
{posting_json}

Rules:
- Open with "Hello! Your posting caught my attention"
- At most 2 paragraphs
- Write like a real person - natural, no stiff formalities
- Mention concrete technologies and projects from the resume
- Show you read the posting - mention the position title, but NOT the company name
- Connect your experience to the posting's requirements
- Do NOT invent details that are not in the resume
- Write in first person
- End naturally, without "Sincerely" or a signature block

Answer: the letter text only."#;

/// Appended to the cover-letter prompt when a prior posting analysis exists.
const COVER_LETTER_ANALYSIS_SECTION: &str = r#"

KNOWN ANALYSIS OF THIS POSTING (address the positives, steer around the red flags, never mention the analysis itself):
{analysis_json}"#;

/// The JSON schema skeleton both résumé-analysis prompts ask the model to fill.
const RESUME_SCHEMA: &str = r#"{
  "personalInfo": {
    "fullName": "full name",
    "email": "email",
    "phone": "phone",
    "location": "location"
  },
  "position": "desired position",
  "about": "short self-description (if present)",
  "experience": [
    {
      "company": "company name",
      "position": "job title",
      "period": "employment period",
      "description": "responsibilities"
    }
  ],
  "education": [
    {
      "institution": "school",
      "degree": "degree / specialization",
      "period": "study period"
    }
  ],
  "skills": [
    {
      "name": "skill name",
      "level": "level (if stated)",
      "verified": false
    }
  ],
  "languages": [
    {
      "language": "language",
      "level": "proficiency level"
    }
  ],
  "courses": [
    {
      "name": "course name",
      "institution": "institution",
      "period": "period",
      "description": "course description"
    }
  ],
  "tests": [
    {
      "name": "test / exam name",
      "score": "result",
      "period": "period",
      "description": "description"
    }
  ],
  "certificates": [
    {
      "name": "certificate name",
      "issuer": "issuing organization",
      "period": "period",
      "description": "description"
    }
  ],
  "additionalInfo": {
    "projects": [],
    "other": "anything else"
  }
}"#;

/// Résumé HTML analysis prompt template. Replace: {schema}, {html}.
const RESUME_HTML_TEMPLATE: &str = r#"Analyze the HTML of a resume page and extract structured information as JSON.

IMPORTANT: Find and include EVERY resume section: work experience, skills, education, about, courses, tests and exams, certificates.
If a section is absent from the resume, leave the corresponding array empty [].

Return a JSON object with exactly this structure:
{schema}

Resume HTML:
{html}"#;

/// Résumé plain-text analysis prompt template. Replace: {schema}, {text}.
const RESUME_TEXT_TEMPLATE: &str = r#"Analyze the text of a resume and extract structured information as JSON.

IMPORTANT: Carefully find and include EVERY resume section:
- Work experience (employers, titles, periods, descriptions)
- Skills (technologies, programming languages, tools)
- Education (institutions, specializations, years)
- About (short self-description, goals)
- Courses and further training
- Tests and exams (with results)
- Certificates and diplomas

If a section is absent from the resume, leave the corresponding array empty [].

Return a JSON object with exactly this structure:
{schema}

Resume text:
{text}"#;

/// Posting-analysis prompt template. Replace: {posting_json}.
const POSTING_ANALYSIS_TEMPLATE: &str = r#"Assess this job posting for toxicity, red flags and overall attractiveness to a candidate.

Return a JSON object with exactly this structure:
{
  "toxicityScore": 4,
  "recommendation": "apply" | "caution" | "avoid",
  "redFlags": ["specific warning sign quoted or paraphrased from the posting"],
  "positives": ["specific good sign from the posting"],
  "summary": "two or three sentences summing up the verdict",
  "salaryAdequacy": "adequate" | "low" | "high" | "not_specified",
  "experienceMatch": "junior_friendly" | "requires_experience" | "unrealistic"
}

Rules:
- toxicityScore is an integer from 1 (healthy) to 10 (toxic)
- Red flags include: vague responsibilities, "we are a family", unpaid overtime expectations,
  salary far below market, demands wildly exceeding the seniority, aggressive or manipulative wording
- Base every flag and positive on the posting text, never on assumptions about the company
- summary must never be empty

JOB POSTING:
{posting_json}"#;

/// Appended to the posting-analysis prompt when a résumé is on file.
const POSTING_ANALYSIS_RESUME_SECTION: &str = r#"

CANDIDATE RESUME (judge experienceMatch and salaryAdequacy against this background):
{resume_json}"#;

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Renders the cover-letter prompt from résumé and posting data, optionally
/// enriched with the most recent posting analysis.
pub fn cover_letter_prompt(
    resume: &Value,
    posting: &Value,
    analysis: Option<&PostingAnalysis>,
) -> String {
    let mut prompt = COVER_LETTER_TEMPLATE
        .replace("{resume_json}", &pretty(resume))
        .replace("{posting_json}", &pretty(posting));

    if let Some(analysis) = analysis {
        let analysis_json = serde_json::to_string_pretty(analysis).unwrap_or_default();
        prompt.push_str(&COVER_LETTER_ANALYSIS_SECTION.replace("{analysis_json}", &analysis_json));
    }

    prompt
}

pub fn resume_html_prompt(html: &str) -> String {
    RESUME_HTML_TEMPLATE
        .replace("{schema}", RESUME_SCHEMA)
        .replace("{html}", html)
}

pub fn resume_text_prompt(text: &str) -> String {
    RESUME_TEXT_TEMPLATE
        .replace("{schema}", RESUME_SCHEMA)
        .replace("{text}", text)
}

/// Renders the posting-analysis prompt, personalized with the latest résumé
/// analysis when one is available.
pub fn posting_analysis_prompt(posting: &Value, resume: Option<&Value>) -> String {
    let mut prompt = POSTING_ANALYSIS_TEMPLATE.replace("{posting_json}", &pretty(posting));

    if let Some(resume) = resume {
        prompt.push_str(&POSTING_ANALYSIS_RESUME_SECTION.replace("{resume_json}", &pretty(resume)));
    }

    prompt
}
