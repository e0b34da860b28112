use common::Language;
use serde::{Deserialize, Serialize};

/// How the sandbox builds and starts a program of one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeConfig {
    pub filename: &'static str,
    pub compile_cmd: Option<&'static str>,
    pub command: &'static str,
}

impl CodeConfig {
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::C => Self {
                filename: "main.c",
                compile_cmd: Some("gcc main.c -o main"),
                command: "./main",
            },
            Language::Cpp => Self {
                filename: "main.cpp",
                compile_cmd: Some("g++ main.cpp -o main"),
                command: "./main",
            },
            Language::Java => Self {
                filename: "Main.java",
                compile_cmd: Some("javac Main.java"),
                command: "java Main",
            },
            Language::Python3 => Self {
                filename: "main.py",
                compile_cmd: None,
                command: "python main.py",
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeMessage {
    pub language: Language,
    pub filename: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_cmd: Option<String>,
    pub command: String,
}

impl CodeMessage {
    pub fn new(language: Language, source: impl Into<String>) -> Self {
        let config = CodeConfig::for_language(language);
        Self {
            language,
            filename: config.filename.to_string(),
            source: source.into(),
            compile_cmd: config.compile_cmd.map(str::to_string),
            command: config.command.to_string(),
        }
    }
}

/// Frames the client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts the session: compile (when needed) and run.
    Code(CodeMessage),
    Input { data: String },
    Exit,
}

/// Frames the sandbox sends.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    CompileSuccess {
        #[serde(default)]
        stdout: String,
    },
    CompileError {
        #[serde(default, alias = "data")]
        stderr: String,
    },
    /// The sandbox consumed one input line.
    Echo {
        #[serde(default)]
        data: String,
    },
    Stdout {
        #[serde(default)]
        data: String,
    },
    Stderr {
        #[serde(default)]
        data: String,
    },
    Exit {
        #[serde(default)]
        return_code: Option<i32>,
    },
    Error {
        #[serde(default)]
        error: String,
    },
}
