use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider families an llm config can name in its `class` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderClass {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "azure-openai")]
    AzureOpenAi,
    #[serde(rename = "bedrock")]
    Bedrock,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "nvidia")]
    Nvidia,
    #[serde(rename = "gemini")]
    Gemini,
}

impl ProviderClass {
    pub const ALL: [ProviderClass; 7] = [
        ProviderClass::OpenAi,
        ProviderClass::AzureOpenAi,
        ProviderClass::Bedrock,
        ProviderClass::Anthropic,
        ProviderClass::Ollama,
        ProviderClass::Nvidia,
        ProviderClass::Gemini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderClass::OpenAi => "openai",
            ProviderClass::AzureOpenAi => "azure-openai",
            ProviderClass::Bedrock => "bedrock",
            ProviderClass::Anthropic => "anthropic",
            ProviderClass::Ollama => "ollama",
            ProviderClass::Nvidia => "nvidia",
            ProviderClass::Gemini => "gemini",
        }
    }

    /// Case-insensitive lookup of a class name.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|class| class.as_str() == lower)
    }
}

impl fmt::Display for ProviderClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(ProviderClass::from_name("OpenAI"), Some(ProviderClass::OpenAi));
        assert_eq!(
            ProviderClass::from_name("Azure-OpenAI"),
            Some(ProviderClass::AzureOpenAi)
        );
        assert_eq!(ProviderClass::from_name(" gemini "), Some(ProviderClass::Gemini));
        assert_eq!(ProviderClass::from_name("llama"), None);
    }

    #[test]
    fn test_names_round_trip() {
        for class in ProviderClass::ALL {
            assert_eq!(ProviderClass::from_name(&class.to_string()), Some(class));
        }
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&ProviderClass::AzureOpenAi).unwrap(),
            "\"azure-openai\""
        );
        let class: ProviderClass = serde_json::from_str("\"bedrock\"").unwrap();
        assert_eq!(class, ProviderClass::Bedrock);
    }
}
