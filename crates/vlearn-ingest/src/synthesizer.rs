//! Concurrent learning-content synthesis.
//!
//! Six generation sub-tasks run concurrently over the transcript and are
//! assembled into a [`VideoContent`] bundle. Summary, main points and the
//! study guide are required; key concepts, vocabulary and analysis degrade
//! gracefully when generation fails.

use tracing::{info, warn};

use vlearn_models::VideoContent;

use crate::error::{IngestError, IngestResult};
use crate::gemini::TextGenerator;

/// Transcripts are truncated to this many characters per prompt.
const PROMPT_TRANSCRIPT_CHARS: usize = 4000;

/// Main points are capped at this count.
const MAX_MAIN_POINTS: usize = 7;

const ANALYSIS_FALLBACK: &str = "Analysis could not be generated for this transcript.";

/// Builds a content bundle from a transcript.
pub struct ContentSynthesizer<'a> {
    generator: &'a dyn TextGenerator,
}

impl<'a> ContentSynthesizer<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self { generator }
    }

    /// Run all six sub-tasks concurrently and assemble the bundle.
    ///
    /// Fails if the transcript is empty or a required sub-task fails.
    pub async fn synthesize(&self, transcript: &str) -> IngestResult<VideoContent> {
        if transcript.trim().is_empty() {
            return Err(IngestError::synthesis("Transcript is empty"));
        }

        let excerpt = truncate_chars(transcript, PROMPT_TRANSCRIPT_CHARS);

        let (summary, main_points, key_concepts, study_guide, vocabulary, analysis) = tokio::join!(
            self.summary(excerpt),
            self.main_points(excerpt),
            self.key_concepts(excerpt),
            self.study_guide(excerpt),
            self.vocabulary(excerpt),
            self.analysis(excerpt),
        );

        let content = VideoContent {
            transcript: transcript.to_string(),
            summary: summary?,
            main_points: main_points?,
            key_concepts,
            study_guide: study_guide?,
            analysis,
            vocabulary,
        };

        info!(
            main_points = content.main_points.len(),
            key_concepts = content.key_concepts.len(),
            vocabulary = content.vocabulary.len(),
            "Content bundle synthesized"
        );

        Ok(content)
    }

    async fn summary(&self, excerpt: &str) -> IngestResult<String> {
        let prompt = format!(
            "Generate a concise 2-3 paragraph summary of the following transcript. \
             Focus on the main ideas, key arguments, and important conclusions:\n\n{}",
            excerpt
        );
        let text = self.generator.generate(&prompt).await?;
        if text.trim().is_empty() {
            return Err(IngestError::synthesis("Empty summary response"));
        }
        Ok(text.trim().to_string())
    }

    async fn main_points(&self, excerpt: &str) -> IngestResult<Vec<String>> {
        let prompt = format!(
            "Extract 5-7 main points from the following transcript. \
             Return each point as a clear, concise statement on a new line:\n\n{}",
            excerpt
        );
        let text = self.generator.generate(&prompt).await?;

        let points: Vec<String> = split_lines(&text).take(MAX_MAIN_POINTS).collect();
        if points.is_empty() {
            return Err(IngestError::synthesis("No main points extracted"));
        }
        Ok(points)
    }

    // Optional: failures degrade to an empty list.
    async fn key_concepts(&self, excerpt: &str) -> Vec<String> {
        let prompt = format!(
            "Extract key concepts, terms, and important topics from the following \
             transcript. Extract only the main 5 topics only. \
             Return each concept on a new line:\n\n{}",
            excerpt
        );
        match self.generator.generate(&prompt).await {
            Ok(text) => split_lines(&text).collect(),
            Err(e) => {
                warn!("Key concept extraction failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn study_guide(&self, excerpt: &str) -> IngestResult<String> {
        let prompt = format!(
            "Create a comprehensive study guide from this transcript. Include:\n\n\
             🎯 MAIN TOPICS\n\
             📚 KEY CONCEPTS\n\
             💡 IMPORTANT DEFINITIONS\n\
             ❓ STUDY QUESTIONS\n\n\
             Transcript:\n{}",
            excerpt
        );
        let text = self.generator.generate(&prompt).await?;
        if text.trim().is_empty() {
            return Err(IngestError::synthesis("Empty study guide response"));
        }
        Ok(text.trim().to_string())
    }

    // Optional: failures degrade to an empty list.
    async fn vocabulary(&self, excerpt: &str) -> Vec<String> {
        let prompt = format!(
            "Extract important terms and their definitions from this transcript. \
             Format as 'Term: Definition' on separate lines:\n\n{}",
            excerpt
        );
        match self.generator.generate(&prompt).await {
            Ok(text) => split_lines(&text).collect(),
            Err(e) => {
                warn!("Vocabulary extraction failed: {}", e);
                Vec::new()
            }
        }
    }

    // Optional: failures degrade to a placeholder string.
    async fn analysis(&self, excerpt: &str) -> String {
        let prompt = format!(
            "Provide a detailed educational analysis of this transcript including:\n\n\
             📊 Main themes and topics\n\
             🎯 Learning objectives\n\
             📈 Difficulty level\n\
             👥 Target audience\n\
             ⭐ Educational value and insights\n\n\
             Transcript:\n{}",
            excerpt
        );
        match self.generator.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => ANALYSIS_FALLBACK.to_string(),
            Err(e) => {
                warn!("Analysis generation failed: {}", e);
                ANALYSIS_FALLBACK.to_string()
            }
        }
    }
}

fn split_lines(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

/// Truncate to at most `max_chars` characters, respecting UTF-8 boundaries.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Answers per-prompt by keyword, or fails matching prompts.
    struct StubGenerator {
        fail_containing: Vec<&'static str>,
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate(&self, prompt: &str) -> IngestResult<String> {
            for needle in &self.fail_containing {
                if prompt.contains(needle) {
                    return Err(IngestError::generation("stubbed failure"));
                }
            }
            let reply = if prompt.contains("summary") {
                "A short summary."
            } else if prompt.contains("main points") {
                "One\nTwo\nThree\nFour\nFive\nSix\nSeven\nEight\nNine"
            } else if prompt.contains("key concepts") {
                "Concept A\nConcept B"
            } else if prompt.contains("study guide") {
                "Guide body"
            } else if prompt.contains("Term: Definition") {
                "Osmosis: Diffusion of water"
            } else {
                "Detailed analysis."
            };
            Ok(reply.to_string())
        }

        async fn generate_json(&self, prompt: &str) -> IngestResult<String> {
            self.generate(prompt).await
        }
    }

    #[tokio::test]
    async fn test_full_bundle() {
        let generator = StubGenerator {
            fail_containing: vec![],
        };
        let content = ContentSynthesizer::new(&generator)
            .synthesize("some transcript text")
            .await
            .unwrap();

        assert_eq!(content.summary, "A short summary.");
        assert_eq!(content.main_points.len(), 7);
        assert_eq!(content.key_concepts, vec!["Concept A", "Concept B"]);
        assert_eq!(content.study_guide, "Guide body");
        assert_eq!(content.vocabulary, vec!["Osmosis: Diffusion of water"]);
        assert_eq!(content.analysis, "Detailed analysis.");
        assert_eq!(content.transcript, "some transcript text");
    }

    #[tokio::test]
    async fn test_optional_tasks_degrade_gracefully() {
        let generator = StubGenerator {
            fail_containing: vec!["key concepts", "Term: Definition", "educational analysis"],
        };
        let content = ContentSynthesizer::new(&generator)
            .synthesize("some transcript text")
            .await
            .unwrap();

        assert!(content.key_concepts.is_empty());
        assert!(content.vocabulary.is_empty());
        assert_eq!(content.analysis, ANALYSIS_FALLBACK);
        assert_eq!(content.summary, "A short summary.");
    }

    #[tokio::test]
    async fn test_required_task_failure_propagates() {
        let generator = StubGenerator {
            fail_containing: vec!["study guide"],
        };
        let err = ContentSynthesizer::new(&generator)
            .synthesize("some transcript text")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Generation(_)));
    }

    #[tokio::test]
    async fn test_empty_transcript_rejected() {
        let generator = StubGenerator {
            fail_containing: vec![],
        };
        let err = ContentSynthesizer::new(&generator)
            .synthesize("   ")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::SynthesisFailed(_)));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "héllo wörld";
        assert_eq!(truncate_chars(text, 5), "héllo");
        assert_eq!(truncate_chars(text, 100), text);
    }
}
