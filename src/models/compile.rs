use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    #[serde(rename = "cpp17")]
    Cpp17,
    #[serde(rename = "java")]
    Java,
    #[serde(rename = "python3")]
    Python3,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Cpp17 => write!(f, "cpp17"),
            Language::Java => write!(f, "java"),
            Language::Python3 => write!(f, "python3"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpp17" | "cpp" | "c++" => Ok(Language::Cpp17),
            "java" => Ok(Language::Java),
            "python3" | "python" | "py" => Ok(Language::Python3),
            other => Err(format!("unsupported language '{}'", other)),
        }
    }
}

/// Body posted to the code execution endpoint
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub code: String,
    pub input: String,
    pub lang: Language,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CompileResponse {
    pub output: String,
}
