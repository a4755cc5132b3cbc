//! Answer generation for document and general questions

use crate::errors::Result;
use crate::llm::{ChatModel, CompletionOptions};

const DOCUMENT_SYSTEM_PROMPT: &str =
    "Always answer strictly from <context> using clean HTML (<p>, <b>, <ul>, <li>), never Markdown.";

const GENERAL_SYSTEM_PROMPT: &str = "Answer general knowledge queries in clean, valid HTML. \
Use headings, lists, and bold tags with no Markdown syntax.";

pub const DOCUMENT_ANSWER_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.3,
    max_tokens: 900,
};

pub const GENERAL_ANSWER_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.6,
    max_tokens: 400,
};

fn document_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an AI assistant that answers questions using only the provided document context.\n\
         Never use external knowledge or assumptions.\n\
         If the answer is not found, say:\n\
         \"I could not find that information in the uploaded documents.\"\n\
         \n\
         <context>\n{}\n</context>\n\
         \n\
         Question: {}\n",
        context, question
    )
}

/// Answer `question` strictly from the assembled document context
pub async fn answer_from_documents(
    model: &dyn ChatModel,
    context: &str,
    question: &str,
) -> Result<String> {
    let prompt = document_prompt(context, question);
    let html = model
        .complete(DOCUMENT_SYSTEM_PROMPT, &prompt, &DOCUMENT_ANSWER_OPTIONS)
        .await?;
    Ok(html.trim().to_string())
}

/// Answer a general-knowledge question as HTML
pub async fn answer_general(model: &dyn ChatModel, question: &str) -> Result<String> {
    let html = model
        .complete(GENERAL_SYSTEM_PROMPT, question, &GENERAL_ANSWER_OPTIONS)
        .await?;
    Ok(html.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture {
        seen: Mutex<Vec<(String, String, CompletionOptions)>>,
    }

    #[async_trait]
    impl ChatModel for Capture {
        async fn complete(&self, system: &str, user: &str, options: &CompletionOptions) -> Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string(), *options));
            Ok("  <p>answer</p>\n".to_string())
        }

        fn model_name(&self) -> &str {
            "capture"
        }
    }

    #[test]
    fn test_document_prompt_wraps_context() {
        let prompt = document_prompt("\n\n### a.txt\ncats", "tell me about cats");
        assert!(prompt.contains("<context>\n\n\n### a.txt\ncats\n</context>"));
        assert!(prompt.trim_end().ends_with("Question: tell me about cats"));
    }

    #[tokio::test]
    async fn test_document_answer_options_and_trim() {
        let model = Capture::default();
        let html = answer_from_documents(&model, "ctx", "q").await.unwrap();
        assert_eq!(html, "<p>answer</p>");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].0, DOCUMENT_SYSTEM_PROMPT);
        assert_eq!(seen[0].2, DOCUMENT_ANSWER_OPTIONS);
    }

    #[tokio::test]
    async fn test_general_answer_passes_question() {
        let model = Capture::default();
        answer_general(&model, "what is rust?").await.unwrap();

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].1, "what is rust?");
        assert_eq!(seen[0].2.max_tokens, 400);
    }
}
