pub mod code;
pub mod config;
pub mod dlq;
pub mod judge_request;
pub mod judger_response;
pub mod language;
pub mod limits;
pub mod mq;
pub mod result_status;

pub use code::{Snippet, Template};
pub use dlq::{DlqEnvelope, DlqErrorCode};
pub use judge_request::{JudgeMode, JudgeRequest, ProblemLimits, UserTestcase};
pub use judger_response::{JudgerResponse, MessageFormatError};
pub use language::Language;
pub use mq::{MessageEnvelope, MessageKind, MessageProperties};
pub use result_status::ResultStatus;
