//! Inference collaborator.

use std::time::Duration;

use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use super::schema::{
    self, CANDIDATE_TAGS_SCHEMA, POLISHED_POSITION_SCHEMA, POSITION_TAGS_SCHEMA, RESUME_SCHEMA,
};
use super::InferenceError;
use crate::tags::types::{
    CATEGORY_NON_TECHNICAL, CATEGORY_TECHNICAL, MARKET_AI, MARKET_FINANCE, MARKET_WEB3,
};

/// Structured extraction over free text. Every method returns the raw
/// payload; callers validate it at the boundary.
pub trait Inference: Send + Sync {
    /// Resume text (OCR output) to a resume document.
    fn extract_profile(&self, text: &str) -> Result<Value, InferenceError>;

    /// Tag-analysis text of a profile to a candidate tag payload.
    fn extract_candidate_tags(&self, summary: &str) -> Result<Value, InferenceError>;

    /// Rewrites a formatted position into fluent recruitment text.
    fn polish_position(&self, content: &str) -> Result<String, InferenceError>;

    /// Polished position text to a tiered position tag payload.
    fn extract_position_tags(&self, content: &str) -> Result<Value, InferenceError>;
}

const PROFILE_PROMPT: &str = "你是一名简历解析助手。请从用户提供的简历文本中提取结构化信息，\
严格按照给定的 JSON 结构输出。缺失的字符串字段填写\"暂无\"，缺失的列表字段输出空数组。\
不要编造简历中不存在的信息。";

const POLISH_PROMPT: &str = "你是一名资深招聘顾问。请将用户提供的职位信息改写为通顺、完整的招聘文案，\
补充职位隐含的技能要求和所属行业，但不要改变原有的职位含义。输出 JSON，content 字段为改写后的全文。";

/// Client for an OpenAI-compatible `/chat/completions` endpoint using
/// `json_schema` response formats.
pub struct ChatInference {
    client: Client,
    url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl ChatInference {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
        })
    }

    fn complete(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema_json: &str,
    ) -> Result<Value, InferenceError> {
        let body = self.request_body(system, user, schema_name, schema_json)?;

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let json: Value = request.send()?.error_for_status()?.json()?;
        parse_completion_json(json)
    }

    /// The schema is sent non-strict. Payloads are validated after the call.
    fn request_body(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema_json: &str,
    ) -> Result<Value, InferenceError> {
        let schema =
            schema::parse(schema_json).map_err(|e| InferenceError::InvalidSchema(e.to_string()))?;

        Ok(serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "schema": schema,
                    "strict": false,
                },
            },
        }))
    }
}

impl Inference for ChatInference {
    fn extract_profile(&self, text: &str) -> Result<Value, InferenceError> {
        self.complete(PROFILE_PROMPT, text, "resume_document", RESUME_SCHEMA)
    }

    fn extract_candidate_tags(&self, summary: &str) -> Result<Value, InferenceError> {
        self.complete(&candidate_tags_prompt(), summary, "candidate_tags", CANDIDATE_TAGS_SCHEMA)
    }

    fn polish_position(&self, content: &str) -> Result<String, InferenceError> {
        let json = self.complete(POLISH_PROMPT, content, "polished_position", POLISHED_POSITION_SCHEMA)?;
        json.get("content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| InferenceError::MalformedResponse("missing content field".to_string()))
    }

    fn extract_position_tags(&self, content: &str) -> Result<Value, InferenceError> {
        self.complete(&position_tags_prompt(), content, "position_tags", POSITION_TAGS_SCHEMA)
    }
}

fn candidate_tags_prompt() -> String {
    format!(
        "你是一名人才画像分析师。根据候选人的简历摘要输出标签。\
category 只能是 \"{}\" 或 \"{}\"；market 只能是 \"{}\"、\"{}\" 或 \"{}\"。\
category_skills 为岗位类别技能，market_field 为所在赛道的细分领域，education 为学历标签，\
title 为最匹配的职位名称，skills 为具体技能关键词，others 为其他亮点。",
        CATEGORY_TECHNICAL, CATEGORY_NON_TECHNICAL, MARKET_WEB3, MARKET_AI, MARKET_FINANCE
    )
}

fn position_tags_prompt() -> String {
    format!(
        "你是一名招聘需求分析师。根据职位描述输出标签。\
category 只能是 \"{}\" 或 \"{}\"；market 只能是 \"{}\"、\"{}\" 或 \"{}\"。\
market_field、education、work_experience、others 分别按 required（必须）、\
recommended（加分）、exclude（排除）三档输出，title 为规范化的职位名称。",
        CATEGORY_TECHNICAL, CATEGORY_NON_TECHNICAL, MARKET_WEB3, MARKET_AI, MARKET_FINANCE
    )
}

/// Reads `choices[0].message.content` and parses it as JSON.
pub(crate) fn parse_completion_json(json: Value) -> Result<Value, InferenceError> {
    let content = json
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| InferenceError::MalformedResponse("missing message content".to_string()))?;

    let trimmed = strip_code_fence(content);
    serde_json::from_str(trimmed)
        .map_err(|e| InferenceError::MalformedResponse(format!("content is not valid JSON: {}", e)))
}

/// Some servers wrap JSON output in a markdown fence despite the response format.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_choice_content_json() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "content": "{\"category\": \"技术类\"}" } }
            ]
        });
        let parsed = parse_completion_json(json).unwrap();
        assert_eq!(parsed["category"], "技术类");
    }

    #[test]
    fn test_parses_fenced_content() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "content": "```json\n{\"content\": \"招聘\"}\n```" } }
            ]
        });
        let parsed = parse_completion_json(json).unwrap();
        assert_eq!(parsed["content"], "招聘");
    }

    #[test]
    fn test_rejects_missing_choices() {
        let err = parse_completion_json(serde_json::json!({ "error": "rate limited" })).unwrap_err();
        assert!(matches!(err, InferenceError::MalformedResponse(_)));
    }

    #[test]
    fn test_rejects_non_json_content() {
        let json = serde_json::json!({
            "choices": [{ "message": { "content": "抱歉，我无法处理" } }]
        });
        assert!(parse_completion_json(json).is_err());
    }

    #[test]
    fn test_url_is_joined_once() {
        let client =
            ChatInference::new("https://api.example.com/v1/", "gpt-4o-mini", None, Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.url, "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn test_request_uses_non_strict_json_schema() {
        let client =
            ChatInference::new("http://localhost:8000/v1", "qwen2.5", None, Duration::from_secs(1))
                .unwrap();
        let body = client
            .request_body("system", "text", "resume_document", RESUME_SCHEMA)
            .unwrap();

        let format = &body["response_format"];
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["json_schema"]["name"], "resume_document");
        assert_eq!(format["json_schema"]["strict"], false);
        assert_eq!(format["json_schema"]["schema"]["title"], "resume-document");
        assert_eq!(body["messages"][1]["content"], "text");
    }

    #[test]
    fn test_prompts_name_every_label() {
        let prompt = candidate_tags_prompt();
        for label in [CATEGORY_TECHNICAL, CATEGORY_NON_TECHNICAL, MARKET_WEB3, MARKET_AI, MARKET_FINANCE] {
            assert!(prompt.contains(label));
        }
    }
}
