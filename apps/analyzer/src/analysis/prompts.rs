// Prompt assembly for resume analysis.

/// Heading of the section listing detected LinkedIn profiles.
pub const LINKEDIN_SECTION_HEADING: &str = "📎 LinkedIn Profiles:";

/// Resume text beyond this many characters is dropped from the prompt.
pub const MAX_RESUME_CHARS: usize = 15_000;

/// Job description text beyond this many characters is dropped from the prompt.
pub const MAX_JOB_DESCRIPTION_CHARS: usize = 5_000;

/// Builds the analysis prompt from normalized resume text, the profile links
/// found during extraction and the raw job description.
///
/// Links are appended as their own section unless the resume already carries
/// one. Both inputs are then cut to their character limits without notice.
pub fn build_analysis_prompt(resume_text: &str, links: &[String], job_description: &str) -> String {
    let mut resume = resume_text.to_string();

    if !links.is_empty() && !resume.contains(LINKEDIN_SECTION_HEADING) {
        let bullets = links
            .iter()
            .map(|link| format!("- {link}"))
            .collect::<Vec<_>>()
            .join("\n");
        resume.push_str(&format!("\n\n{LINKEDIN_SECTION_HEADING}\n{bullets}"));
    }

    let resume = truncate_chars(&resume, MAX_RESUME_CHARS);
    let job_description = truncate_chars(job_description, MAX_JOB_DESCRIPTION_CHARS);

    format!(
        r#"You're an AI-powered resume evaluator.

**Resume Content (includes LinkedIn if found):**
{resume}

**Job Description:**
{job_description}

Provide the following structured analysis:

## 🔍 Match Score (0-100)
- Score and reasoning

## ✅ Top 3 Strengths
- Clear bullet points

## ❌ Gaps / Missing Skills
- Compared to job description

## 💡 Suggestions for Improvement
- Short and actionable

Make sure to preserve and highlight any LinkedIn profiles included in the resume.
"#
    )
}

/// First `max` characters of `text` (not bytes, so multi-byte text is never split).
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
