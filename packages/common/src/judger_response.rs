use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ResultStatus;

/// Execution details for one test case, as reported by the judge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestcaseJudgeResult {
    pub testcase_id: i32,
    pub result_code: i64,
    /// Milliseconds of CPU time.
    pub cpu_time: i64,
    #[serde(default)]
    pub real_time: i64,
    /// Bytes.
    pub memory: i64,
    #[serde(default)]
    pub signal: i32,
    #[serde(default)]
    pub exit_code: i32,
    #[serde(default)]
    pub error_code: i32,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeData {
    pub accepted_num: i32,
    pub total_testcase: i32,
    pub judge_result: Vec<TestcaseJudgeResult>,
}

/// Result message consumed from the judge's result queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgerResponse {
    pub result_code: i64,
    /// Echo of the request's message id.
    pub submission_result_id: String,
    pub error: String,
    #[serde(default)]
    pub data: Option<JudgeData>,
}

/// The message can never be processed, no matter how often it is redelivered.
#[derive(Debug, Error)]
pub enum MessageFormatError {
    #[error("Malformed judger response: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("Malformed judger response: {0}")]
    Field(String),
}

impl JudgerResponse {
    /// Deserialize and validate a raw result payload.
    pub fn parse(payload: serde_json::Value) -> Result<Self, MessageFormatError> {
        let response: JudgerResponse = serde_json::from_value(payload)?;
        if response.submission_result_id.trim().is_empty() {
            return Err(MessageFormatError::Field(
                "submissionResultId must not be empty".into(),
            ));
        }
        Ok(response)
    }

    pub fn status(&self) -> ResultStatus {
        ResultStatus::from_result_code(self.result_code)
    }

    /// Details of the (single) test case this message reports on.
    pub fn testcase_result(&self) -> Option<&TestcaseJudgeResult> {
        self.data.as_ref().and_then(|data| data.judge_result.first())
    }

    /// Text shown to the submitter: program output when the judge sent
    /// some, otherwise the compiler message for compile errors.
    pub fn output(&self) -> Option<String> {
        if let Some(output) = self.testcase_result().and_then(|r| r.output.clone()) {
            if !output.is_empty() {
                return Some(output);
            }
        }
        match self.status() {
            ResultStatus::CompileError if !self.error.is_empty() => Some(self.error.clone()),
            _ => None,
        }
    }
}
