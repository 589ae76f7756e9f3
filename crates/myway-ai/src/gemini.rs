//! Gemini `generateContent` client.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use myway_models::study_packs::{Flashcard, QuizContent, SummaryContent};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use crate::error::GenerationError;
use crate::generator::StudyContentGenerator;

// Prompts are capped so one huge material can't blow the request size.
const MAX_SOURCE_CHARS: usize = 30_000;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiGenerator {
    pub fn new(
        api_key: String,
        model: String,
        api_base: String,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                tracing::error!(error = %error, "failed to build http client for gemini");
                GenerationError::HttpClientBuild(error)
            })?;

        Ok(Self {
            client,
            api_key,
            model,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn generate(&self, prompt: String, json_output: bool) -> Result<String, GenerationError> {
        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        if json_output {
            body["generationConfig"] = json!({ "responseMimeType": "application/json" });
        }

        tracing::debug!("sending gemini request");
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                let error = GenerationError::from(error);
                tracing::warn!(error = %error, "gemini call failed");
                error
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "gemini returned an error status");
            return Err(GenerationError::Provider {
                status: status.as_u16(),
                message: truncate(&message, 500).to_string(),
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        extract_text(parsed)
    }

    async fn generate_json<T: DeserializeOwned>(&self, prompt: String) -> Result<T, GenerationError> {
        let text = self.generate(prompt, true).await?;
        parse_json_payload(&text)
    }
}

#[async_trait]
impl StudyContentGenerator for GeminiGenerator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate_summary(&self, text: &str) -> Result<SummaryContent, GenerationError> {
        let prompt = format!(
            "Summarize the following study material for a student. Respond with JSON of the form \
             {{\"summary\": string, \"bullets\": [string]}} with 3 to 7 bullets.\n\n{}",
            truncate(text, MAX_SOURCE_CHARS)
        );
        let summary: SummaryContent = self.generate_json(prompt).await?;
        if summary.summary.trim().is_empty() {
            return Err(GenerationError::InvalidResponse("empty summary".to_string()));
        }
        Ok(summary)
    }

    async fn generate_quiz(&self, text: &str) -> Result<QuizContent, GenerationError> {
        let prompt = format!(
            "Write a multiple-choice quiz of 5 questions about the following study material. \
             Respond with JSON of the form {{\"questions\": [{{\"id\": string, \"prompt\": string, \
             \"options\": [string], \"answer\": string, \"explanation\": string}}]}}. \
             Each answer must be exactly one of its options and ids must be unique.\n\n{}",
            truncate(text, MAX_SOURCE_CHARS)
        );
        let quiz: QuizContent = self.generate_json(prompt).await?;
        validate_quiz(&quiz)?;
        Ok(quiz)
    }

    async fn generate_flashcards(&self, text: &str) -> Result<Vec<Flashcard>, GenerationError> {
        let prompt = format!(
            "Create 8 to 12 flashcards from the following study material. Respond with a JSON \
             array of objects of the form {{\"front\": string, \"back\": string}}.\n\n{}",
            truncate(text, MAX_SOURCE_CHARS)
        );
        let cards: Vec<Flashcard> = self.generate_json(prompt).await?;
        if cards.is_empty() {
            return Err(GenerationError::InvalidResponse("no flashcards".to_string()));
        }
        Ok(cards)
    }

    async fn answer_question(
        &self,
        context: &str,
        query: &str,
    ) -> Result<String, GenerationError> {
        let prompt = format!(
            "You are a tutor for the course described below. Answer the student's question \
             using the course outline as context. If the outline does not cover it, say so.\n\n\
             Course outline:\n{}\n\nQuestion: {}",
            truncate(context, MAX_SOURCE_CHARS),
            query
        );
        let answer = self.generate(prompt, false).await?;
        Ok(answer.trim().to_string())
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize, Serialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Part {
    text: Option<String>,
}

fn extract_text(response: GenerateContentResponse) -> Result<String, GenerationError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerationError::InvalidResponse("empty candidate".to_string()));
    }
    Ok(text)
}

/// Parses a JSON payload, tolerating a surrounding markdown code fence.
fn parse_json_payload<T: DeserializeOwned>(text: &str) -> Result<T, GenerationError> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(unfenced.trim())
        .map_err(|e| GenerationError::InvalidResponse(format!("malformed JSON: {}", e)))
}

fn validate_quiz(quiz: &QuizContent) -> Result<(), GenerationError> {
    if quiz.questions.is_empty() {
        return Err(GenerationError::InvalidResponse("quiz has no questions".to_string()));
    }
    let mut seen = HashSet::new();
    for question in &quiz.questions {
        if !seen.insert(question.id.as_str()) {
            return Err(GenerationError::InvalidResponse(format!(
                "duplicate question id {}",
                question.id
            )));
        }
        if !question.options.iter().any(|o| o == &question.answer) {
            return Err(GenerationError::InvalidResponse(format!(
                "answer for question {} is not one of its options",
                question.id
            )));
        }
    }
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
