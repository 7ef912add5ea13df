//! Quiz generation with tolerant JSON parsing.
//!
//! Model output is repaired before parsing: code fences are stripped, the
//! JSON array is sliced out of surrounding prose, and trailing commas are
//! removed. Malformed questions are normalized rather than rejected where
//! a sensible repair exists.

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use vlearn_models::{Quiz, QuizQuestion, VideoContent, VideoId};

use crate::error::{IngestError, IngestResult};
use crate::gemini::TextGenerator;

/// Every question is normalized to this many options.
const OPTIONS_PER_QUESTION: usize = 4;

pub const DEFAULT_NUM_QUESTIONS: usize = 5;

/// Generates quizzes from a stored content bundle.
pub struct QuizGenerator<'a> {
    generator: &'a dyn TextGenerator,
}

impl<'a> QuizGenerator<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self { generator }
    }

    /// Generate a quiz for a video's content bundle.
    ///
    /// Returns fewer than `num_questions` questions if the model under-delivers
    /// but produced at least one valid question.
    pub async fn generate(
        &self,
        video_id: &VideoId,
        title: &str,
        content: &VideoContent,
        num_questions: usize,
    ) -> IngestResult<Quiz> {
        let prompt = build_quiz_prompt(title, content, num_questions);
        let response = self.generator.generate_json(&prompt).await?;

        let mut questions = parse_quiz_response(&response)?;

        if questions.len() > num_questions {
            questions.truncate(num_questions);
        }
        if questions.is_empty() {
            return Err(IngestError::QuizParse(
                "No valid quiz questions generated".to_string(),
            ));
        }
        if questions.len() < num_questions {
            warn!(
                video_id = %video_id,
                requested = num_questions,
                got = questions.len(),
                "Model returned fewer questions than requested"
            );
        }

        info!(video_id = %video_id, questions = questions.len(), "Quiz generated");

        Ok(Quiz {
            video_id: video_id.clone(),
            questions,
            generated_at: Utc::now(),
        })
    }
}

fn build_quiz_prompt(title: &str, content: &VideoContent, num_questions: usize) -> String {
    let mut prompt = format!(
        "You are an expert educational content creator. Generate a {num}-question \
         multiple-choice quiz based on the following video content.\n\n\
         📹 VIDEO TITLE: {title}\n\n\
         📝 VIDEO CONTENT:\n\
         Summary: {summary}\n\n\
         Main Points:\n",
        num = num_questions,
        title = title,
        summary = content.summary,
    );

    for (i, point) in content.main_points.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, point));
    }

    prompt.push_str(&format!(
        "\nKey Concepts: {}\n\n\
         Study Guide:\n{}\n\n\
         Important Vocabulary: {}\n\n\
         🎯 QUIZ GENERATION REQUIREMENTS:\n\
         1. Create exactly {} multiple-choice questions\n\
         2. Each question should have 4 options (A, B, C, D)\n\
         3. Questions should test different levels of understanding:\n\
            - Factual recall (30%)\n\
            - Conceptual understanding (40%)\n\
            - Application/analysis (30%)\n\
         4. Include a clear explanation for each correct answer\n\
         5. Make questions challenging but fair\n\
         6. Avoid trick questions or ambiguous wording\n\
         7. Ensure options are plausible and roughly equal in length\n\n\
         📋 REQUIRED JSON FORMAT:\n\
         Return ONLY a JSON array with this exact structure:\n\
         [\n\
           {{\n\
             \"question\": \"Clear, specific question text?\",\n\
             \"options\": [\"Option A\", \"Option B\", \"Option C\", \"Option D\"],\n\
             \"correct_answer\": \"Option A\",\n\
             \"explanation\": \"Detailed explanation of why this answer is correct.\"\n\
           }}\n\
         ]\n\n\
         IMPORTANT: Return ONLY the JSON array, no additional text, formatting, \
         or explanations outside the JSON.\n",
        content.key_concepts.join(", "),
        content.study_guide,
        content.vocabulary.join(", "),
        num_questions,
    ));

    prompt
}

/// Parse a model response into validated quiz questions.
pub fn parse_quiz_response(response: &str) -> IngestResult<Vec<QuizQuestion>> {
    let cleaned = strip_fence_lines(response.trim());

    // Slice out the array: models sometimes prepend or append prose.
    let start = cleaned
        .find('[')
        .ok_or_else(|| IngestError::QuizParse("No JSON array in response".to_string()))?;
    let end = cleaned
        .rfind(']')
        .ok_or_else(|| IngestError::QuizParse("No JSON array in response".to_string()))?;
    if end < start {
        return Err(IngestError::QuizParse(
            "No JSON array in response".to_string(),
        ));
    }

    let json_content = remove_trailing_commas(&cleaned[start..=end]);

    let items: Vec<Value> = serde_json::from_str(&json_content)
        .map_err(|e| IngestError::QuizParse(format!("Invalid quiz JSON: {}", e)))?;

    items.into_iter().map(normalize_question).collect()
}

fn normalize_question(item: Value) -> IngestResult<QuizQuestion> {
    let obj = item
        .as_object()
        .ok_or_else(|| IngestError::QuizParse("Question is not an object".to_string()))?;

    let question = required_str(obj, "question")?;
    let explanation = required_str(obj, "explanation")?;
    let correct_answer = required_str(obj, "correct_answer")?;

    let mut options: Vec<String> = obj
        .get("options")
        .and_then(Value::as_array)
        .ok_or_else(|| IngestError::QuizParse("Missing required field: options".to_string()))?
        .iter()
        .filter_map(Value::as_str)
        .map(|s| s.trim().to_string())
        .collect();

    if options.len() < 2 {
        return Err(IngestError::QuizParse(
            "Each question must have at least 2 options".to_string(),
        ));
    }
    while options.len() < OPTIONS_PER_QUESTION {
        options.push(format!("Option {}", options.len() + 1));
    }
    options.truncate(OPTIONS_PER_QUESTION);

    let correct_answer = match_correct_answer(&correct_answer, &options);

    Ok(QuizQuestion {
        question,
        options,
        correct_answer,
        explanation,
    })
}

/// Match the declared answer to an option: exact, then case-insensitive,
/// then the first option as a last resort.
fn match_correct_answer(declared: &str, options: &[String]) -> String {
    let declared = declared.trim();

    if options.iter().any(|o| o == declared) {
        return declared.to_string();
    }

    let lower = declared.to_lowercase();
    if let Some(matched) = options.iter().find(|o| o.to_lowercase() == lower) {
        return matched.clone();
    }

    warn!(
        declared,
        "Correct answer not found in options, falling back to first option"
    );
    options[0].clone()
}

fn required_str(obj: &serde_json::Map<String, Value>, field: &str) -> IngestResult<String> {
    obj.get(field)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| IngestError::QuizParse(format!("Missing required field: {}", field)))
}

/// Drop a leading/trailing code-fence line if present.
fn strip_fence_lines(text: &str) -> String {
    if !text.starts_with("```") {
        return text.to_string();
    }
    let mut lines: Vec<&str> = text.lines().collect();
    if lines
        .first()
        .is_some_and(|l| l.trim_start().starts_with("```"))
    {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.trim_end().ends_with("```")) {
        lines.pop();
    }
    lines.join("\n")
}

/// Remove commas that directly precede a closing brace or bracket.
///
/// Operates outside string literals only.
fn remove_trailing_commas(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in json.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '}' | ']' => {
                // Drop a comma separated from this close by whitespace only
                let trimmed_len = out.trim_end().len();
                if out[..trimmed_len].ends_with(',') {
                    let tail = out.split_off(trimmed_len - 1);
                    out.push_str(tail.strip_prefix(',').unwrap_or(&tail));
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"[
        {
            "question": "What is osmosis?",
            "options": ["Diffusion of water", "Cell division", "Protein synthesis", "Respiration"],
            "correct_answer": "Diffusion of water",
            "explanation": "Osmosis is the diffusion of water across a membrane."
        }
    ]"#;

    #[test]
    fn test_parse_valid_array() {
        let questions = parse_quiz_response(VALID).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_answer, "Diffusion of water");
        assert_eq!(questions[0].options.len(), 4);
    }

    #[test]
    fn test_parse_fenced_response() {
        let fenced = format!("```json\n{}\n```", VALID);
        let questions = parse_quiz_response(&fenced).unwrap();
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn test_parse_with_surrounding_prose() {
        let wrapped = format!("Here is your quiz:\n{}\nEnjoy!", VALID);
        let questions = parse_quiz_response(&wrapped).unwrap();
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn test_trailing_commas_repaired() {
        let broken = r#"[
            {
                "question": "Q?",
                "options": ["A", "B", "C", "D",],
                "correct_answer": "A",
                "explanation": "Because.",
            },
        ]"#;
        let questions = parse_quiz_response(broken).unwrap();
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn test_comma_inside_string_preserved() {
        let json = r#"[{"question": "Pick one, please?", "options": ["A", "B"], "correct_answer": "A", "explanation": "x, y"}]"#;
        let questions = parse_quiz_response(json).unwrap();
        assert_eq!(questions[0].question, "Pick one, please?");
        assert_eq!(questions[0].explanation, "x, y");
    }

    #[test]
    fn test_options_padded_to_four() {
        let json = r#"[{"question": "Q?", "options": ["A", "B"], "correct_answer": "B", "explanation": "e"}]"#;
        let questions = parse_quiz_response(json).unwrap();
        assert_eq!(
            questions[0].options,
            vec!["A", "B", "Option 3", "Option 4"]
        );
        assert_eq!(questions[0].correct_answer, "B");
    }

    #[test]
    fn test_options_truncated_to_four() {
        let json = r#"[{"question": "Q?", "options": ["A", "B", "C", "D", "E", "F"], "correct_answer": "A", "explanation": "e"}]"#;
        let questions = parse_quiz_response(json).unwrap();
        assert_eq!(questions[0].options.len(), 4);
    }

    #[test]
    fn test_case_insensitive_answer_match() {
        let json = r#"[{"question": "Q?", "options": ["Alpha", "Beta"], "correct_answer": "ALPHA", "explanation": "e"}]"#;
        let questions = parse_quiz_response(json).unwrap();
        assert_eq!(questions[0].correct_answer, "Alpha");
    }

    #[test]
    fn test_unmatched_answer_falls_back_to_first_option() {
        let json = r#"[{"question": "Q?", "options": ["Alpha", "Beta"], "correct_answer": "Gamma", "explanation": "e"}]"#;
        let questions = parse_quiz_response(json).unwrap();
        assert_eq!(questions[0].correct_answer, "Alpha");
    }

    #[test]
    fn test_too_few_options_rejected() {
        let json = r#"[{"question": "Q?", "options": ["Only"], "correct_answer": "Only", "explanation": "e"}]"#;
        assert!(parse_quiz_response(json).is_err());
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = r#"[{"question": "Q?", "options": ["A", "B"], "explanation": "e"}]"#;
        assert!(parse_quiz_response(json).is_err());
    }

    #[test]
    fn test_no_array_rejected() {
        assert!(parse_quiz_response("I could not produce a quiz.").is_err());
        assert!(parse_quiz_response("{\"not\": \"an array\"}").is_err());
    }

    #[test]
    fn test_prompt_includes_bundle_sections() {
        let content = VideoContent {
            transcript: "t".into(),
            summary: "A summary.".into(),
            main_points: vec!["Point one".into(), "Point two".into()],
            key_concepts: vec!["Osmosis".into()],
            study_guide: "Guide.".into(),
            analysis: "Analysis.".into(),
            vocabulary: vec!["Term: Def".into()],
        };
        let prompt = build_quiz_prompt("Biology 101", &content, 5);
        assert!(prompt.contains("Biology 101"));
        assert!(prompt.contains("1. Point one"));
        assert!(prompt.contains("2. Point two"));
        assert!(prompt.contains("Osmosis"));
        assert!(prompt.contains("exactly 5 multiple-choice"));
    }
}
