mod common;
mod judge_result;
mod store;
