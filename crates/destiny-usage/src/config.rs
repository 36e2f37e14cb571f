//! Configuration for [`UsageLimiter`](crate::UsageLimiter).

use std::fmt;
use std::str::FromStr;

use destiny_core::defaults::DEFAULT_DAILY_LIMIT;

/// What the limiter does when a stored record cannot be read or decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadFailurePolicy {
    /// Treat the record as absent (quota restarts for the day).
    #[default]
    Open,

    /// Deny the request.
    Closed,
}

/// How strictly the daily quota is enforced under concurrent requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Enforcement {
    /// Unsynchronized read-modify-write. Concurrent requests for the same
    /// user may each observe `count < limit`, admitting extra requests.
    #[default]
    Relaxed,

    /// Serialize checks per user id; exactly `daily_limit` requests pass.
    Strict,
}

/// Error returned when parsing a policy name fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParsePolicyError {
    kind: &'static str,
    value: String,
}

impl FromStr for ReadFailurePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(ParsePolicyError {
                kind: "read failure policy",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ReadFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Closed => "closed",
        })
    }
}

impl FromStr for Enforcement {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relaxed" => Ok(Self::Relaxed),
            "strict" => Ok(Self::Strict),
            _ => Err(ParsePolicyError {
                kind: "enforcement mode",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Enforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Relaxed => "relaxed",
            Self::Strict => "strict",
        })
    }
}

/// Limiter settings.
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    /// Allowed requests per user per calendar day.
    pub daily_limit: u32,
    /// Behavior on unreadable records.
    pub read_failure: ReadFailurePolicy,
    /// Concurrency discipline for `check_and_consume`.
    pub enforcement: Enforcement,
}

impl LimiterConfig {
    /// Config with the given limit and default policies.
    pub fn with_limit(daily_limit: u32) -> Self {
        Self {
            daily_limit,
            ..Self::default()
        }
    }

    /// Set the read-failure policy.
    pub fn read_failure(mut self, policy: ReadFailurePolicy) -> Self {
        self.read_failure = policy;
        self
    }

    /// Set the enforcement mode.
    pub fn enforcement(mut self, enforcement: Enforcement) -> Self {
        self.enforcement = enforcement;
        self
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
            read_failure: ReadFailurePolicy::default(),
            enforcement: Enforcement::default(),
        }
    }
}
