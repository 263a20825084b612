#![forbid(unsafe_code)]

use std::env;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use gmi_contracts::ReasonCodeId;
use serde::Deserialize;
use serde_json::{json, Value};

pub mod reason_codes {
    use gmi_contracts::ReasonCodeId;

    pub const EXTRACT_OK: ReasonCodeId = ReasonCodeId(0x4558_0001);

    pub const EXTRACT_NO_FILE: ReasonCodeId = ReasonCodeId(0x4558_00F1);
    pub const EXTRACT_BAD_BASE64: ReasonCodeId = ReasonCodeId(0x4558_00F2);
    pub const EXTRACT_MISSING_API_KEY: ReasonCodeId = ReasonCodeId(0x4558_00F3);
    pub const EXTRACT_PROVIDER_UPSTREAM: ReasonCodeId = ReasonCodeId(0x4558_00F4);
    pub const EXTRACT_NO_TEXT_CONTENT: ReasonCodeId = ReasonCodeId(0x4558_00F5);
    pub const EXTRACT_UNPARSEABLE_REPLY: ReasonCodeId = ReasonCodeId(0x4558_00F6);
}

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_TIMEOUT_MS: u32 = 60_000;
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The exact JSON shape the provider is instructed to return. Field names
/// here are the wire names of `TobBenefits` plus the premium sub-object;
/// the uploader form binds to them one-to-one.
const TARGET_SCHEMA: &str = r#"{
  "providerName": "Insurance company name",
  "tpa": "TPA name (e.g., NEXTCARE, NAS, MEDNET)",
  "network": "Network type/name",
  "areaOfCover": "Geographical coverage",
  "aggregateLimit": "Annual limit amount",
  "medicalUnderwriting": "Any underwriting conditions",

  "roomType": "Room accommodation type",
  "diagnosticTests": "Diagnostic tests coverage",
  "drugsMedicines": "Drugs and medicines coverage",
  "consultantFees": "Consultant/surgeon fees coverage",
  "organTransplant": "Organ transplant coverage",
  "kidneyDialysis": "Kidney dialysis coverage",
  "inpatientCopay": "Inpatient copay/coinsurance",

  "referralType": "Direct access or GP referral required",
  "outpatientConsultation": "Outpatient consultation coverage",
  "diagnosticLabs": "Lab tests coverage",
  "pharmacyLimit": "Pharmacy limit",
  "pharmacyCopay": "Pharmacy copay",
  "medicineType": "Branded/Generic/Formulary",
  "prescribedPhysiotherapy": "Physiotherapy sessions",

  "inPatientMaternity": "Inpatient maternity coverage",
  "outPatientMaternity": "Outpatient maternity coverage",
  "routineDental": "Dental benefits",
  "routineOptical": "Optical benefits",
  "preventiveServices": "Preventive care coverage",
  "alternativeMedicines": "Alternative medicine coverage",
  "repatriation": "Repatriation coverage",
  "mentalHealth": "Mental health coverage",

  "premium": {
    "catAMembers": 0,
    "catAPremium": 0,
    "catBMembers": 0,
    "catBPremium": 0
  }
}"#;

/// Wire shape of `POST /api/extract-tob`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub file: String,
    #[serde(rename = "mediaType", default)]
    pub media_type: String,
    #[serde(rename = "fileName", default)]
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractRefuseKind {
    InvalidInput,
    MissingConfig,
    Upstream,
    UnparseableReply,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractRefuse {
    pub reason_code: ReasonCodeId,
    pub kind: ExtractRefuseKind,
    pub message: String,
    /// The provider's raw text, preserved for diagnosis when the reply
    /// could not be parsed as JSON. Never set for other refusals.
    pub raw: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractOutcome {
    Ok { extracted: Value, file_name: String },
    Refuse(ExtractRefuse),
}

#[derive(Debug, Clone)]
pub struct ExtractProviderConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u32,
    pub user_agent: String,
}

impl ExtractProviderConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env_or("GMI_EXTRACT_ENDPOINT", DEFAULT_ENDPOINT),
            api_key: env::var("GMI_CLAUDE_API_KEY")
                .or_else(|_| env::var("ANTHROPIC_API_KEY"))
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            model: env_or("GMI_EXTRACT_MODEL", DEFAULT_MODEL),
            max_tokens: env_parsed("GMI_EXTRACT_MAX_TOKENS", DEFAULT_MAX_TOKENS),
            timeout_ms: env_parsed("GMI_EXTRACT_TIMEOUT_MS", DEFAULT_TIMEOUT_MS),
            user_agent: env_or("GMI_EXTRACT_USER_AGENT", "gmi-comparison-tool/0.1"),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parsed(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct ExtractRuntime {
    config: ExtractProviderConfig,
}

impl ExtractRuntime {
    pub fn new(config: ExtractProviderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractProviderConfig {
        &self.config
    }

    /// One outbound call, no retry. Every failure mode maps to a refusal;
    /// this never panics and never blocks longer than the configured
    /// timeouts.
    pub fn run(&self, request: &ExtractRequest) -> ExtractOutcome {
        if request.file.trim().is_empty() {
            return refuse_input(reason_codes::EXTRACT_NO_FILE, "No file provided");
        }
        if BASE64.decode(request.file.as_bytes()).is_err() {
            return refuse_input(
                reason_codes::EXTRACT_BAD_BASE64,
                "File payload is not valid base64",
            );
        }
        let Some(api_key) = self.config.api_key.as_deref() else {
            return ExtractOutcome::Refuse(ExtractRefuse {
                reason_code: reason_codes::EXTRACT_MISSING_API_KEY,
                kind: ExtractRefuseKind::MissingConfig,
                message: "API key not configured".to_string(),
                raw: None,
            });
        };

        let payload = build_provider_payload(
            &self.config.model,
            self.config.max_tokens,
            &request.media_type,
            &request.file,
        );

        let reply = match self.post_messages(api_key, &payload) {
            Ok(reply) => reply,
            Err(refuse) => return ExtractOutcome::Refuse(refuse),
        };

        let Some(text) = extract_text_reply(&reply) else {
            return ExtractOutcome::Refuse(ExtractRefuse {
                reason_code: reason_codes::EXTRACT_NO_TEXT_CONTENT,
                kind: ExtractRefuseKind::Upstream,
                message: "No response from AI".to_string(),
                raw: None,
            });
        };

        match parse_extracted_json(&text) {
            Ok(extracted) => ExtractOutcome::Ok {
                extracted,
                file_name: request.file_name.clone(),
            },
            Err(raw) => ExtractOutcome::Refuse(ExtractRefuse {
                reason_code: reason_codes::EXTRACT_UNPARSEABLE_REPLY,
                kind: ExtractRefuseKind::UnparseableReply,
                message: "Failed to parse extracted data".to_string(),
                raw: Some(raw),
            }),
        }
    }

    fn post_messages(&self, api_key: &str, payload: &Value) -> Result<Value, ExtractRefuse> {
        let timeout = Duration::from_millis(u64::from(self.config.timeout_ms).max(100));
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(&self.config.user_agent)
            .build();

        let response = agent
            .post(&self.config.endpoint)
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
            .set("x-api-key", api_key)
            .set("anthropic-version", ANTHROPIC_VERSION)
            .send_json(payload.clone())
            .map_err(|err| upstream_refuse(&err))?;

        serde_json::from_reader(response.into_reader()).map_err(|_| ExtractRefuse {
            reason_code: reason_codes::EXTRACT_PROVIDER_UPSTREAM,
            kind: ExtractRefuseKind::Upstream,
            message: "Failed to process document".to_string(),
            raw: None,
        })
    }
}

fn refuse_input(reason_code: ReasonCodeId, message: &str) -> ExtractOutcome {
    ExtractOutcome::Refuse(ExtractRefuse {
        reason_code,
        kind: ExtractRefuseKind::InvalidInput,
        message: message.to_string(),
        raw: None,
    })
}

fn upstream_refuse(err: &ureq::Error) -> ExtractRefuse {
    let message = match err {
        ureq::Error::Status(status, _) => {
            format!("Failed to process document (provider status {status})")
        }
        ureq::Error::Transport(_) => "Failed to process document".to_string(),
    };
    ExtractRefuse {
        reason_code: reason_codes::EXTRACT_PROVIDER_UPSTREAM,
        kind: ExtractRefuseKind::Upstream,
        message,
        raw: None,
    }
}

/// Assemble the single user message: a document part for PDFs, an image
/// part for everything else, followed by the fixed instruction.
pub fn build_provider_payload(
    model: &str,
    max_tokens: u32,
    media_type: &str,
    file_b64: &str,
) -> Value {
    let (part, source_word) = if media_type == "application/pdf" {
        (
            json!({
                "type": "document",
                "source": {
                    "type": "base64",
                    "media_type": "application/pdf",
                    "data": file_b64,
                }
            }),
            "document",
        )
    } else {
        (
            json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": media_type,
                    "data": file_b64,
                }
            }),
            "image",
        )
    };

    json!({
        "model": model,
        "max_tokens": max_tokens,
        "messages": [
            {
                "role": "user",
                "content": [part, {"type": "text", "text": extraction_instruction(source_word)}],
            }
        ],
    })
}

pub fn extraction_instruction(source_word: &str) -> String {
    format!(
        "Extract all insurance benefits data from this Table of Benefits (TOB) {source_word}.\n\n\
         Return the data as a JSON object with this exact structure:\n{TARGET_SCHEMA}\n\n\
         Extract as much information as possible from the {source_word}. \
         For any field not found, use \"-\" or leave empty.\n\
         Return ONLY the JSON object, no additional text or markdown."
    )
}

/// Pull the first text part out of a Messages-API reply.
pub fn extract_text_reply(reply: &Value) -> Option<String> {
    reply
        .get("content")?
        .as_array()?
        .iter()
        .find(|part| part.get("type").and_then(Value::as_str) == Some("text"))?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

/// Strip markdown code-fence wrapping and parse the remainder. On parse
/// failure the raw (unstripped) text is handed back for diagnosis.
pub fn parse_extracted_json(text: &str) -> Result<Value, String> {
    let stripped = strip_code_fences(text);
    serde_json::from_str(&stripped).map_err(|_| text.to_string())
}

pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_without_key() -> ExtractProviderConfig {
        ExtractProviderConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: "test".to_string(),
        }
    }

    fn request(file: &str, media_type: &str) -> ExtractRequest {
        ExtractRequest {
            file: file.to_string(),
            media_type: media_type.to_string(),
            file_name: "tob.pdf".to_string(),
        }
    }

    #[test]
    fn at_extract_01_missing_file_is_an_input_refusal() {
        let runtime = ExtractRuntime::new(config_without_key());
        match runtime.run(&request("", "application/pdf")) {
            ExtractOutcome::Refuse(refuse) => {
                assert_eq!(refuse.kind, ExtractRefuseKind::InvalidInput);
                assert_eq!(refuse.reason_code, reason_codes::EXTRACT_NO_FILE);
                assert_eq!(refuse.message, "No file provided");
            }
            other => panic!("expected Refuse, got {other:?}"),
        }
    }

    #[test]
    fn at_extract_02_invalid_base64_is_rejected_before_any_call() {
        let runtime = ExtractRuntime::new(config_without_key());
        match runtime.run(&request("not//valid@@base64!", "image/png")) {
            ExtractOutcome::Refuse(refuse) => {
                assert_eq!(refuse.reason_code, reason_codes::EXTRACT_BAD_BASE64);
                assert_eq!(refuse.kind, ExtractRefuseKind::InvalidInput);
            }
            other => panic!("expected Refuse, got {other:?}"),
        }
    }

    #[test]
    fn at_extract_03_missing_api_key_is_a_config_refusal() {
        let runtime = ExtractRuntime::new(config_without_key());
        // "aGVsbG8=" is valid base64 ("hello"), so the key check is next.
        match runtime.run(&request("aGVsbG8=", "application/pdf")) {
            ExtractOutcome::Refuse(refuse) => {
                assert_eq!(refuse.kind, ExtractRefuseKind::MissingConfig);
                assert_eq!(refuse.message, "API key not configured");
            }
            other => panic!("expected Refuse, got {other:?}"),
        }
    }

    #[test]
    fn at_extract_04_pdf_and_image_payloads_differ_in_part_type() {
        let pdf = build_provider_payload("m", 64, "application/pdf", "QUJD");
        assert_eq!(pdf["messages"][0]["content"][0]["type"], "document");
        assert_eq!(
            pdf["messages"][0]["content"][0]["source"]["media_type"],
            "application/pdf"
        );

        let img = build_provider_payload("m", 64, "image/jpeg", "QUJD");
        assert_eq!(img["messages"][0]["content"][0]["type"], "image");
        assert_eq!(
            img["messages"][0]["content"][0]["source"]["media_type"],
            "image/jpeg"
        );

        let text = img["messages"][0]["content"][1]["text"].as_str().unwrap();
        assert!(text.contains("from this Table of Benefits (TOB) image"));
        assert!(text.contains("\"providerName\""));
        assert!(text.contains("\"catBPremium\""));
    }

    #[test]
    fn at_extract_05_code_fences_are_stripped_before_parsing() {
        let fenced = "```json\n{\"providerName\": \"Daman\"}\n```";
        let parsed = parse_extracted_json(fenced).unwrap();
        assert_eq!(parsed["providerName"], "Daman");

        let bare_fence = "```\n{\"tpa\": \"NAS\"}\n```";
        let parsed = parse_extracted_json(bare_fence).unwrap();
        assert_eq!(parsed["tpa"], "NAS");

        let plain = "{\"network\": \"RN\"}";
        assert_eq!(parse_extracted_json(plain).unwrap()["network"], "RN");
    }

    #[test]
    fn at_extract_06_unparseable_reply_preserves_raw_text() {
        let raw = "The document appears to be a scanned fax; I could not read it.";
        let err = parse_extracted_json(raw).unwrap_err();
        assert_eq!(err, raw);
    }

    #[test]
    fn at_extract_07_text_part_is_found_among_other_parts() {
        let reply = serde_json::json!({
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "{\"tpa\": \"MEDNET\"}"}
            ]
        });
        assert_eq!(
            extract_text_reply(&reply).as_deref(),
            Some("{\"tpa\": \"MEDNET\"}")
        );

        let no_text = serde_json::json!({"content": [{"type": "tool_use"}]});
        assert_eq!(extract_text_reply(&no_text), None);
    }
}
