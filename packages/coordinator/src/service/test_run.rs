use std::fmt;
use std::str::FromStr;

use common::MessageKind;
use uuid::Uuid;

use crate::store::TestRunKind;

/// Message id of a test-run request: `"{user_id}:{run_id}:{testcase_id}"`.
///
/// The run id tells apart results of the user's current run from late
/// results of a run it replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunKey {
    pub user_id: i32,
    pub run_id: String,
    pub testcase_id: i32,
}

impl RunKey {
    pub fn new(user_id: i32, run_id: &str, testcase_id: i32) -> Self {
        Self {
            user_id,
            run_id: run_id.to_string(),
            testcase_id,
        }
    }
}

pub fn new_run_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.user_id, self.run_id, self.testcase_id)
    }
}

impl FromStr for RunKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let user_id = parts.next().ok_or(())?.parse().map_err(|_| ())?;
        let run_id = parts.next().filter(|r| !r.is_empty()).ok_or(())?;
        let testcase_id = parts.next().ok_or(())?.parse().map_err(|_| ())?;
        Ok(Self::new(user_id, run_id, testcase_id))
    }
}

impl TestRunKind {
    pub fn message_kind(self) -> MessageKind {
        match self {
            TestRunKind::Public => MessageKind::Run,
            TestRunKind::User => MessageKind::UserTest,
        }
    }

    pub fn from_message_kind(kind: MessageKind) -> Option<Self> {
        match kind {
            MessageKind::Run => Some(TestRunKind::Public),
            MessageKind::UserTest => Some(TestRunKind::User),
            MessageKind::Judge => None,
        }
    }
}
