//! Per-language resource limits.
//!
//! A problem stores one time limit (milliseconds) and one memory limit
//! (mebibytes). Interpreters and managed runtimes need more headroom than
//! native code, so the judge receives limits that were stretched by a
//! language-specific linear rule. All coefficients live in [`LimitRule::for_language`].

use crate::Language;

const MIB: u64 = 1024 * 1024;

/// `value * slope + intercept`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Linear {
    pub slope: u64,
    pub intercept: u64,
}

impl Linear {
    pub const IDENTITY: Linear = Linear::new(1, 0);

    pub const fn new(slope: u64, intercept: u64) -> Self {
        Self { slope, intercept }
    }

    pub fn apply(&self, value: u64) -> u64 {
        value.saturating_mul(self.slope).saturating_add(self.intercept)
    }
}

/// Time rule works on milliseconds, memory rule on mebibytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitRule {
    pub time: Linear,
    pub memory: Linear,
}

impl LimitRule {
    pub const fn for_language(language: Language) -> LimitRule {
        match language {
            Language::C | Language::Cpp => LimitRule {
                time: Linear::IDENTITY,
                memory: Linear::IDENTITY,
            },
            Language::Java => LimitRule {
                time: Linear::new(2, 1000),
                memory: Linear::new(2, 16),
            },
            Language::Python3 => LimitRule {
                time: Linear::new(3, 200),
                memory: Linear::new(2, 32),
            },
        }
    }
}

/// Effective time limit in milliseconds.
pub fn time_limit(language: Language, base_ms: u64) -> u64 {
    LimitRule::for_language(language).time.apply(base_ms)
}

/// Effective memory limit in bytes.
pub fn memory_limit(language: Language, base_mb: u64) -> u64 {
    LimitRule::for_language(language)
        .memory
        .apply(base_mb)
        .saturating_mul(MIB)
}
