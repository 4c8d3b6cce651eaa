//! Command execution.

use crate::{Commands, EncodingArg};
use amfwire_core::json::{from_json, to_json};
use amfwire_protocol::{Body, CodecContext, Decoder, Encoder, Header, Message, ObjectEncoding};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::error::Error;
use std::sync::Arc;

/// JSON form of a message.
#[derive(Debug, Serialize, Deserialize)]
struct MessageDoc {
    #[serde(default = "default_version")]
    version: u16,
    #[serde(default)]
    headers: Vec<HeaderDoc>,
    #[serde(default)]
    bodies: Vec<BodyDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct HeaderDoc {
    name: String,
    #[serde(default)]
    must_understand: bool,
    #[serde(default)]
    content: Json,
}

#[derive(Debug, Serialize, Deserialize)]
struct BodyDoc {
    target: String,
    #[serde(default = "null_response")]
    response: String,
    #[serde(default)]
    content: Json,
}

fn default_version() -> u16 {
    ObjectEncoding::Amf3.version()
}

fn null_response() -> String {
    "null".to_string()
}

impl From<EncodingArg> for ObjectEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Amf0 => ObjectEncoding::Amf0,
            EncodingArg::Amf3 => ObjectEncoding::Amf3,
        }
    }
}

/// Executes a command and returns the formatted output.
pub fn execute(context: &Arc<CodecContext>, cmd: Commands) -> Result<String, Box<dyn Error>> {
    match cmd {
        Commands::Decode { file, hex } => {
            let raw = std::fs::read(&file)?;
            let bytes = if hex { decode_hex(&String::from_utf8(raw)?)? } else { raw };

            let mut decoder = Decoder::with_context(context.clone());
            let message = decoder.decode(bytes)?;
            let mut output = format_json(&message_to_json(&message)?);
            for failure in decoder.failed_bodies() {
                output.push_str(&format!(
                    "\n{} body {} ({}): {}",
                    "Failed".yellow(),
                    failure.index,
                    failure.target.cyan(),
                    failure.error
                ));
            }
            Ok(output)
        }

        Commands::Encode { json, output } => {
            let doc = parse_json_arg(&json)?;
            let message = message_from_json(doc)?;
            let bytes = Encoder::with_context(context.clone()).encode(&message)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &bytes)?;
                    Ok(format!(
                        "{} {} bytes to {}",
                        "Wrote".green(),
                        bytes.len(),
                        path.display().to_string().cyan()
                    ))
                }
                None => Ok(hex::encode(&bytes)),
            }
        }

        Commands::Value { encoding, hex } => {
            let bytes = decode_hex(&hex)?;
            let value = Decoder::with_context(context.clone()).decode_value(encoding.into(), bytes)?;
            Ok(format_json(&to_json(&value)))
        }
    }
}

/// Decodes hex text, ignoring whitespace.
fn decode_hex(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(compact)
}

fn message_to_json(message: &Message) -> Result<Json, serde_json::Error> {
    let doc = MessageDoc {
        version: message.version,
        headers: message
            .headers
            .iter()
            .map(|h| HeaderDoc {
                name: h.name.clone(),
                must_understand: h.must_understand,
                content: to_json(&h.content),
            })
            .collect(),
        bodies: message
            .bodies
            .iter()
            .map(|b| BodyDoc {
                target: b.target.clone(),
                response: b.response.clone(),
                content: to_json(&b.content),
            })
            .collect(),
    };
    serde_json::to_value(doc)
}

fn message_from_json(json: Json) -> Result<Message, Box<dyn Error>> {
    let doc: MessageDoc = serde_json::from_value(json)?;
    let mut message = Message {
        version: doc.version,
        ..Message::default()
    };
    for header in doc.headers {
        message.add_header(Header::new(
            header.name,
            header.must_understand,
            from_json(&header.content)?,
        ));
    }
    for body in doc.bodies {
        message.add_body(Body::new(body.target, body.response, from_json(&body.content)?));
    }
    Ok(message)
}

/// Parses a JSON argument (supports @file syntax).
fn parse_json_arg(arg: &str) -> Result<Json, Box<dyn Error>> {
    if let Some(path) = arg.strip_prefix('@') {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(arg)?)
    }
}

/// Formats JSON for display.
fn format_json(value: &Json) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
