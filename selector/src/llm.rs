//! Hosted-LLM move selection over each provider's completion endpoint.

use crate::catalog::Provider;
use crate::traits::{MoveSelector, SelectionRequest, SelectorError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const MISTRAL_URL: &str = "https://api.mistral.ai/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const GOOGLE_URL_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Selector backed by a hosted chat-completion model.
///
/// The client carries no request timeout on purpose: a stalled provider
/// stalls that attempt, and the match loop stays responsive around it.
pub struct LlmSelector {
    client: reqwest::Client,
}

impl Default for LlmSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmSelector {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MoveSelector for LlmSelector {
    async fn pick_move(&self, req: &SelectionRequest) -> Result<usize, SelectorError> {
        let prompt = build_prompt(req);
        tracing::debug!(
            provider = req.provider.as_str(),
            model = %req.model,
            options = req.moves.len(),
            "Requesting move selection"
        );

        let reply = match req.provider {
            Provider::OpenAi => {
                self.chat_completion(OPENAI_URL, &req.api_key, &req.model, &prompt)
                    .await?
            }
            Provider::Mixtral => {
                self.chat_completion(MISTRAL_URL, &req.api_key, &req.model, &prompt)
                    .await?
            }
            Provider::Anthropic => self.anthropic_message(req, &prompt).await?,
            Provider::Google => self.google_generate(req, &prompt).await?,
        };

        let index = parse_move_index(&reply).ok_or_else(|| SelectorError::BadReply(reply))?;
        Ok(index)
    }
}

impl LlmSelector {
    /// OpenAI-style chat completions; Mistral speaks the same protocol.
    async fn chat_completion(
        &self,
        url: &str,
        api_key: &str,
        model: &str,
        prompt: &str,
    ) -> Result<String, SelectorError> {
        let body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: 16,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: ChatResponse = read_json(response).await?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| SelectorError::BadReply("empty choices".to_string()))
    }

    async fn anthropic_message(
        &self,
        req: &SelectionRequest,
        prompt: &str,
    ) -> Result<String, SelectorError> {
        let body = AnthropicRequest {
            model: &req.model,
            max_tokens: 16,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &req.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        let parsed: AnthropicResponse = read_json(response).await?;

        parsed
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| SelectorError::BadReply("empty content".to_string()))
    }

    async fn google_generate(
        &self,
        req: &SelectionRequest,
        prompt: &str,
    ) -> Result<String, SelectorError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GOOGLE_URL_BASE, req.model, req.api_key
        );
        let body = GoogleRequest {
            contents: vec![GoogleContent {
                parts: vec![GooglePart { text: prompt }],
            }],
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let parsed: GoogleResponse = read_json(response).await?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| SelectorError::BadReply("empty candidates".to_string()))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SelectorError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(SelectorError::Api {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(SelectorError::Json)
}

/// Render the numbered-options prompt. Indices are zero-based and must
/// line up with the oracle's legal-move order.
fn build_prompt(req: &SelectionRequest) -> String {
    let mut prompt = format!(
        "You are playing a game of chess as {}.\n\nCurrent position:\n{}\nPrevious move: {}\n\nChoose your next move from these options:\n",
        req.color.as_str(),
        req.board,
        req.last_move,
    );
    for (i, described) in req.moves.iter().enumerate() {
        prompt.push_str(&format!("{}: {}\n", i, described));
    }
    prompt.push_str("\nReply with only the number of the move you choose.");
    prompt
}

/// Pull the first run of digits out of the reply. A number written as
/// negative is not a valid option index and fails the parse.
fn parse_move_index(reply: &str) -> Option<usize> {
    let start = reply.find(|c: char| c.is_ascii_digit())?;
    if reply[..start].ends_with('-') {
        return None;
    }
    let digits = &reply[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Deserialize)]
struct ChatReplyMessage {
    content: String,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String,
}

#[derive(Serialize)]
struct GoogleRequest<'a> {
    contents: Vec<GoogleContent<'a>>,
}

#[derive(Serialize)]
struct GoogleContent<'a> {
    parts: Vec<GooglePart<'a>>,
}

#[derive(Serialize)]
struct GooglePart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GoogleResponse {
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    content: GoogleReplyContent,
}

#[derive(Deserialize)]
struct GoogleReplyContent {
    parts: Vec<GoogleReplyPart>,
}

#[derive(Deserialize)]
struct GoogleReplyPart {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::PlayerSide;

    fn request() -> SelectionRequest {
        SelectionRequest {
            board: "diagram\n".to_string(),
            moves: vec![
                "Pawn moves to e4".to_string(),
                "Knight moves to f3".to_string(),
            ],
            provider: Provider::OpenAi,
            model: "gpt-4o".to_string(),
            color: PlayerSide::White,
            last_move: "No previous moves yet.".to_string(),
            api_key: "k".to_string(),
        }
    }

    #[test]
    fn test_prompt_numbers_options_from_zero() {
        let prompt = build_prompt(&request());
        assert!(prompt.contains("0: Pawn moves to e4"));
        assert!(prompt.contains("1: Knight moves to f3"));
        assert!(prompt.contains("playing a game of chess as White"));
        assert!(prompt.contains("No previous moves yet."));
    }

    #[test]
    fn test_parse_move_index() {
        assert_eq!(parse_move_index("2"), Some(2));
        assert_eq!(parse_move_index("I choose move 14."), Some(14));
        assert_eq!(parse_move_index("Move: 3 (Nf3)"), Some(3));
        assert_eq!(parse_move_index("no digits here"), None);
        assert_eq!(parse_move_index(""), None);
    }

    #[test]
    fn test_negative_reply_is_rejected() {
        assert_eq!(parse_move_index("-1"), None);
        assert_eq!(parse_move_index("I choose -2"), None);
        // A dash elsewhere does not poison a plain number.
        assert_eq!(parse_move_index("option - 4"), Some(4));
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"7"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "7");
    }

    #[test]
    fn test_parse_google_response() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"12"}],"role":"model"}}]}"#;
        let parsed: GoogleResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.candidates[0].content.parts[0].text, "12");
    }
}
