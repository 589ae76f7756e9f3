use async_trait::async_trait;
use myway_models::study_packs::{Flashcard, QuizContent, SummaryContent};

use crate::error::GenerationError;

#[async_trait]
pub trait StudyContentGenerator: Send + Sync {
    /// Provider name, for logs and metrics labels.
    fn name(&self) -> &'static str;

    async fn generate_summary(&self, text: &str) -> Result<SummaryContent, GenerationError>;

    async fn generate_quiz(&self, text: &str) -> Result<QuizContent, GenerationError>;

    async fn generate_flashcards(&self, text: &str) -> Result<Vec<Flashcard>, GenerationError>;

    /// Answers `query` using only `context` as course knowledge.
    async fn answer_question(&self, context: &str, query: &str)
    -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableGenerator;

#[async_trait]
impl StudyContentGenerator for UnavailableGenerator {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn generate_summary(&self, _text: &str) -> Result<SummaryContent, GenerationError> {
        Err(GenerationError::Unavailable)
    }

    async fn generate_quiz(&self, _text: &str) -> Result<QuizContent, GenerationError> {
        Err(GenerationError::Unavailable)
    }

    async fn generate_flashcards(&self, _text: &str) -> Result<Vec<Flashcard>, GenerationError> {
        Err(GenerationError::Unavailable)
    }

    async fn answer_question(
        &self,
        _context: &str,
        _query: &str,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_generator_fails_closed() {
        let generator = UnavailableGenerator;
        assert!(matches!(
            generator.generate_summary("text").await,
            Err(GenerationError::Unavailable)
        ));
        assert!(matches!(
            generator.answer_question("ctx", "why?").await,
            Err(GenerationError::Unavailable)
        ));
        assert_eq!(
            GenerationError::Unavailable.to_string(),
            "generation unavailable"
        );
    }
}
