//! OpenAI-compatible chat completion.

use geofill_runtime::{
    extract_model_json, normalize_api_url, FormScanResult, ModelJsonError, Profile, Settings,
    SmartFillMapping,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{HttpTransport, NetError};

const API_BODY_PREVIEW: usize = 100;
const FORMAT_BODY_PREVIEW: usize = 50;
const PROFILE_TEMPERATURE: f32 = 0.7;
const FORM_TEMPERATURE: f32 = 0.3;

const PROFILE_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that generates realistic user data in JSON format.";
const FORM_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that fills forms based on user profiles.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl ChatResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .map(|choice| choice.message.content.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("API Error ({status}): {body}...")]
    Api { status: u16, body: String },
    #[error("API 返回了非 JSON 数据 (可能是 HTML)。请检查 API 地址是否正确。预览: {preview}...")]
    Format { preview: String },
    #[error("response has no choices")]
    EmptyChoices,
    #[error("invalid model output: {0}")]
    Parse(#[from] ModelJsonError),
    #[error(transparent)]
    Transport(#[from] NetError),
    #[error("请输入 API Key")]
    MissingKey,
}

fn preview(body: &str, limit: usize) -> String {
    body.chars().take(limit).collect()
}

/// Validate an HTTP response before any JSON parsing.
///
/// Non-2xx is an API error carrying the start of the body; a 2xx answer
/// without a JSON content type is a format error, typically an HTML page
/// served by a wrong base URL.
pub fn check_chat_response(
    status: u16,
    content_type: Option<&str>,
    body: &str,
) -> Result<(), AiError> {
    if !(200..300).contains(&status) {
        return Err(AiError::Api {
            status,
            body: preview(body, API_BODY_PREVIEW),
        });
    }
    let is_json = content_type.is_some_and(|value| value.contains("application/json"));
    if !is_json {
        return Err(AiError::Format {
            preview: preview(body, FORMAT_BODY_PREVIEW),
        });
    }
    Ok(())
}

pub fn interpret_chat_response(
    status: u16,
    content_type: Option<&str>,
    body: &str,
) -> Result<ChatResponse, AiError> {
    check_chat_response(status, content_type, body)?;
    serde_json::from_str(body).map_err(|err| AiError::Transport(NetError::Decode(err)))
}

/// Send `request` and return the first choice's content.
pub async fn complete(
    transport: &dyn HttpTransport,
    settings: &Settings,
    request: &ChatRequest,
) -> Result<String, AiError> {
    if settings.openai_key.trim().is_empty() {
        return Err(AiError::MissingKey);
    }
    let url = normalize_api_url(&settings.openai_base_url);
    tracing::info!(target: "geofill::ai", url = %url, model = %request.model, "ai.request");
    let body = serde_json::to_value(request).map_err(NetError::Decode)?;
    let response = transport
        .post_json(&url, settings.openai_key.trim(), &body)
        .await?;
    let parsed = interpret_chat_response(
        response.status,
        response.content_type.as_deref(),
        &response.body,
    )
    .inspect_err(|err| {
        tracing::warn!(target: "geofill::ai", status = response.status, error = %err, "ai.response_rejected")
    })?;
    parsed
        .first_content()
        .map(str::to_string)
        .ok_or(AiError::EmptyChoices)
}

pub fn profile_prompt(country: &str, locked: &Profile, persona: &str) -> String {
    let mut prompt = format!("Generate a realistic user profile for a person in {country}.");
    if !locked.is_empty() {
        let locked_json = serde_json::to_string(locked).unwrap_or_default();
        prompt.push_str(&format!(
            "\n\nLOCKED ATTRIBUTES (You MUST respect these): {locked_json}"
        ));
    }
    if !persona.trim().is_empty() {
        prompt.push_str(&format!(
            "\n\nPersona Description: {persona}\n\nEnsure the generated profile matches this persona perfectly."
        ));
    }
    if country == "Japan" {
        prompt.push_str(
            "\n\nIMPORTANT for Japan:\n\
             - ZipCode: \"NNN-NNNN\" (e.g. 100-0001)\n\
             - Phone: Generate a **RANDOM** mobile number \"090-XXXX-XXXX\" (or 080/070). **DO NOT** use \"1234\" or \"0000\".\n\
             - Name: Kanji for First/Last name, and Katakana for reading if applicable (but return standard keys).",
        );
    }
    prompt.push_str(
        " Return ONLY a valid JSON object with the following keys: firstName, lastName, gender (male/female), \
         birthday (YYYY-MM-DD), username, email, password, phone, address, city, state, zipCode. \
         Ensure the data is culturally appropriate for the country.",
    );
    prompt
}

pub fn form_prompt(profile: &Profile, persona: &str, scan: &FormScanResult) -> String {
    let profile_json = serde_json::to_string(profile).unwrap_or_default();
    let fields_json = serde_json::to_string(&scan.fields).unwrap_or_default();
    let persona = if persona.trim().is_empty() { "None" } else { persona };
    let context = &scan.page_context;
    format!(
        "You are an advanced AI Form Assistant. Fill the web form below, acting as the Persona.\n\n\
         Current User Profile: {profile_json}\n\
         Persona Description: {persona}\n\n\
         Page Context:\nTitle: {title}\nDescription: {description}\nURL: {url}\n\n\
         Form Fields Found:\n{fields_json}\n\n\
         Instructions:\n\
         1. Determine the purpose of this form and whether each field is required or sensitive.\n\
         2. Use the Persona's data for standard required fields; leave optional intrusive fields empty.\n\
         3. ALWAYS use Half-width (ASCII) characters for Password, Email, Phone, Postal Code and Numbers.\n\
         4. If the form expects a local address and the profile address is foreign, invent a valid local address.\n\
         5. The page language is '{language}'. Adapt formats accordingly. For Japan use surname-first order, \
         Kanji for names, Katakana for readings, NNN-NNNN postal codes and a random 090/080/070 mobile number \
         that does not use \"1234\" or \"0000\".\n\
         6. Invent missing data consistently with the Persona.\n\n\
         Output Format:\nReturn ONLY a valid JSON object where keys are the field 'id' and values are the string to fill.",
        title = context.title,
        description = context.description,
        url = context.url,
        language = context.language,
    )
}

/// Ask the model for a profile. The result is raw model output; callers
/// apply the local field policy before it reaches the user.
pub async fn generate_profile(
    transport: &dyn HttpTransport,
    settings: &Settings,
    country: &str,
    locked: &Profile,
) -> Result<Profile, AiError> {
    let request = ChatRequest {
        model: settings.openai_model.clone(),
        messages: vec![
            ChatMessage::system(PROFILE_SYSTEM_PROMPT),
            ChatMessage::user(profile_prompt(country, locked, &settings.ai_persona)),
        ],
        temperature: Some(PROFILE_TEMPERATURE),
        max_tokens: None,
    };
    let content = complete(transport, settings, &request).await?;
    let object = extract_model_json(&content)?;
    Ok(Profile::from_json_object(&object))
}

/// Ask the model to map profile data onto scanned form fields.
pub async fn map_form(
    transport: &dyn HttpTransport,
    settings: &Settings,
    profile: &Profile,
    scan: &FormScanResult,
) -> Result<SmartFillMapping, AiError> {
    let request = ChatRequest {
        model: settings.openai_model.clone(),
        messages: vec![
            ChatMessage::system(FORM_SYSTEM_PROMPT),
            ChatMessage::user(form_prompt(profile, &settings.ai_persona, scan)),
        ],
        temperature: Some(FORM_TEMPERATURE),
        max_tokens: None,
    };
    let content = complete(transport, settings, &request).await?;
    Ok(extract_model_json(&content)?)
}

/// Minimal round trip used by the connectivity test.
pub async fn test_connection(
    transport: &dyn HttpTransport,
    settings: &Settings,
) -> Result<(), AiError> {
    if settings.openai_key.trim().is_empty() {
        return Err(AiError::MissingKey);
    }
    let url = normalize_api_url(&settings.openai_base_url);
    let request = ChatRequest {
        model: settings.openai_model.trim().to_string(),
        messages: vec![ChatMessage::user("Hi")],
        temperature: None,
        max_tokens: Some(5),
    };
    let body = serde_json::to_value(&request).map_err(NetError::Decode)?;
    let response = transport
        .post_json(&url, settings.openai_key.trim(), &body)
        .await?;
    check_chat_response(
        response.status,
        response.content_type.as_deref(),
        &response.body,
    )?;
    serde_json::from_str::<Value>(&response.body).map_err(NetError::Decode)?;
    tracing::info!(target: "geofill::ai", url = %url, "ai.test_ok");
    Ok(())
}
