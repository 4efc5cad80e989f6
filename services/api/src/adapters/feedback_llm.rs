//! services/api/src/adapters/feedback_llm.rs
//!
//! This module contains the adapter for the interview feedback LLM.
//! It implements the `InterviewFeedbackService` port from the `core` crate.

const SYSTEM_INSTRUCTIONS: &str = r#"You are an experienced technical interviewer at a career-training institute.
You will receive the transcript of a mock interview between an AI interviewer and a student.

Evaluate the student's answers only:
- Clarity and structure of their explanations.
- Technical correctness and depth.
- Communication and confidence.

Respond with a single JSON object and nothing else:
{"feedback": "<3-6 sentences of specific, constructive feedback addressed to the student>", "score": <integer from 0 to 10>}"#;

use academy_core::domain::{InterviewFeedback, MAX_INTERVIEW_SCORE};
use academy_core::ports::{InterviewFeedbackService, PortError, PortResult};
use async_openai::{
    config::OpenAIConfig, error::OpenAIError, types::responses::CreateResponseArgs, Client,
};
use async_trait::async_trait;
use serde::Deserialize;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `InterviewFeedbackService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiFeedbackAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiFeedbackAdapter {
    /// Creates a new `OpenAiFeedbackAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

#[derive(Deserialize)]
struct RawFeedback {
    feedback: String,
    score: f64,
}

/// Extracts the JSON evaluation from the model output, tolerating surrounding prose
/// or markdown fences.
pub fn parse_feedback(raw: &str) -> PortResult<InterviewFeedback> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => {
            return Err(PortError::Unexpected(
                "Feedback LLM response contained no JSON object.".to_string(),
            ))
        }
    };

    let parsed: RawFeedback =
        serde_json::from_str(json).map_err(|e| PortError::Unexpected(e.to_string()))?;
    let score = parsed.score.round().clamp(0.0, f64::from(MAX_INTERVIEW_SCORE)) as u8;

    Ok(InterviewFeedback {
        feedback: parsed.feedback.trim().to_string(),
        score,
    })
}

//=========================================================================================
// `InterviewFeedbackService` Trait Implementation
//=========================================================================================

#[async_trait]
impl InterviewFeedbackService for OpenAiFeedbackAdapter {
    async fn evaluate_transcript(&self, transcript: &str) -> PortResult<InterviewFeedback> {
        let request = CreateResponseArgs::default()
            .model(&self.model)
            .instructions(SYSTEM_INSTRUCTIONS)
            .input(format!("TRANSCRIPT:\n---\n{}\n---", transcript))
            .max_output_tokens(800u32)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .responses()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let raw = response.output_text().unwrap_or_default();
        parse_feedback(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let feedback = parse_feedback(r#"{"feedback": "Solid answers.", "score": 7}"#).unwrap();
        assert_eq!(feedback.score, 7);
        assert_eq!(feedback.feedback, "Solid answers.");
    }

    #[test]
    fn tolerates_markdown_fences_and_clamps_score() {
        let raw = "```json\n{\"feedback\": \" Great depth. \", \"score\": 14.2}\n```";
        let feedback = parse_feedback(raw).unwrap();
        assert_eq!(feedback.score, 10);
        assert_eq!(feedback.feedback, "Great depth.");
    }

    #[test]
    fn rejects_output_without_json() {
        assert!(parse_feedback("I could not evaluate this interview.").is_err());
    }
}
