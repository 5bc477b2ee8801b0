//! Keys the assistant reads from its env file, their defaults, and the
//! placeholder rule that decides whether a credential still has to be asked for.

use tracing::trace;

use super::EnvDocument;

pub const USE_OPENAI_API: &str = "USE_OPENAI_API";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const OPENAI_TRANSCRIPTION_MODEL: &str = "OPENAI_TRANSCRIPTION_MODEL";
pub const WHISPER_MODEL: &str = "WHISPER_MODEL";
pub const AUDIO_DEVICE_INDEX: &str = "AUDIO_DEVICE_INDEX";
pub const MAX_RECORDING_TIME: &str = "MAX_RECORDING_TIME";
pub const DEFAULT_IDE: &str = "DEFAULT_IDE";
pub const USE_PROMPT_ENHANCEMENT: &str = "USE_PROMPT_ENHANCEMENT";
pub const LOG_LEVEL: &str = "LOG_LEVEL";

/// A documented key and the value used when the file does not set it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownKey {
    pub key: &'static str,
    pub default: Option<&'static str>,
    pub description: &'static str,
}

pub const KNOWN_KEYS: &[KnownKey] = &[
    KnownKey {
        key: USE_OPENAI_API,
        default: Some("false"),
        description: "Use the paid OpenAI Whisper API for transcription",
    },
    KnownKey {
        key: OPENAI_API_KEY,
        default: None,
        description: "OpenAI API key for Whisper transcription",
    },
    KnownKey {
        key: ANTHROPIC_API_KEY,
        default: None,
        description: "Anthropic API key for Claude Computer Use",
    },
    KnownKey {
        key: GEMINI_API_KEY,
        default: None,
        description: "Gemini API key for screenshot analysis",
    },
    KnownKey {
        key: OPENAI_TRANSCRIPTION_MODEL,
        default: Some("whisper-1"),
        description: "OpenAI transcription model",
    },
    KnownKey {
        key: WHISPER_MODEL,
        default: Some("base"),
        description: "Local Whisper model size",
    },
    KnownKey {
        key: AUDIO_DEVICE_INDEX,
        default: Some("0"),
        description: "Audio input device index",
    },
    KnownKey {
        key: MAX_RECORDING_TIME,
        default: Some("30.0"),
        description: "Maximum recording duration in seconds",
    },
    KnownKey {
        key: DEFAULT_IDE,
        default: Some("windsurf"),
        description: "Application commands are sent to",
    },
    KnownKey {
        key: USE_PROMPT_ENHANCEMENT,
        default: Some("false"),
        description: "Rewrite spoken prompts before sending them",
    },
    KnownKey {
        key: LOG_LEVEL,
        default: Some("INFO"),
        description: "Assistant log level",
    },
];

pub fn default_for(key: &str) -> Option<&'static str> {
    KNOWN_KEYS
        .iter()
        .find(|known| known.key == key)
        .and_then(|known| known.default)
}

/// True for checked-in example values of the form `your_<name>_here`
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    value.len() >= "your__here".len() && value.starts_with("your_") && value.ends_with("_here")
}

/// Whether the bootstrapper should ask for `key`: it is absent, empty, or
/// still holds a placeholder. Any other value is never asked for again.
pub fn needs_prompt(key: &str, current: Option<&str>) -> bool {
    let needed = match current {
        None => true,
        Some(value) => value.trim().is_empty() || is_placeholder(value),
    };
    trace!(key, needed, "prompt check");
    needed
}

/// Lenient boolean reading: true/1/yes/on and false/0/no/off, any case
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Canonical spelling written back for flags
pub fn format_bool(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Read access to an env document with documented defaults applied
#[derive(Debug, Clone, Copy)]
pub struct ConfigView<'a> {
    doc: &'a EnvDocument,
}

impl<'a> ConfigView<'a> {
    pub fn new(doc: &'a EnvDocument) -> Self {
        Self { doc }
    }

    /// File value, else the documented default
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.doc.get(key).or_else(|| default_for(key))
    }

    /// A usable credential: set and not a placeholder
    pub fn credential(&self, key: &str) -> Option<&'a str> {
        self.doc
            .get(key)
            .filter(|value| !needs_prompt(key, Some(*value)))
    }

    pub fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(parse_bool).unwrap_or(false)
    }
}
