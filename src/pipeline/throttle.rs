//! Per-vessel, per-message-type throttle policy
//!
//! Rules are matched against `(identifier, message_type)`. All rules that
//! match a sighting share one `last_processed_at` entry keyed by that pair,
//! so the longest matching interval effectively wins.

use std::collections::HashMap;

pub const DEFAULT_THROTTLE_INTERVAL_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTarget {
    Any,
    Identifier(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleRule {
    pub target: RuleTarget,
    pub message_type: i64,
    pub interval_secs: i64,
}

impl ThrottleRule {
    pub fn new(target: RuleTarget, message_type: i64) -> Self {
        Self {
            target,
            message_type,
            interval_secs: DEFAULT_THROTTLE_INTERVAL_SECS,
        }
    }

    pub fn with_interval(mut self, interval_secs: i64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    fn matches(&self, identifier: &str, message_type: i64) -> bool {
        let target_matches = match &self.target {
            RuleTarget::Any => true,
            RuleTarget::Identifier(id) => id == identifier,
        };
        target_matches && self.message_type == message_type
    }

    /// Parse a comma-separated rule list, e.g. `*:5:30,244123456:1`
    ///
    /// Each rule is `IDENTIFIER:TYPE[:SECONDS]`; `*` matches any identifier
    /// and a missing interval defaults to 30 seconds.
    pub fn parse_list(s: &str) -> Result<Vec<ThrottleRule>, String> {
        s.split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(Self::parse_one)
            .collect()
    }

    fn parse_one(s: &str) -> Result<ThrottleRule, String> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        if parts.len() < 2 || parts.len() > 3 || parts[0].is_empty() {
            return Err(format!("invalid throttle rule '{}'", s));
        }

        let target = match parts[0] {
            "*" => RuleTarget::Any,
            id => RuleTarget::Identifier(id.to_string()),
        };
        let message_type = parts[1]
            .parse::<i64>()
            .map_err(|_| format!("invalid message type in throttle rule '{}'", s))?;

        let mut rule = ThrottleRule::new(target, message_type);
        if let Some(secs) = parts.get(2) {
            let secs = secs
                .parse::<i64>()
                .ok()
                .filter(|v| *v >= 0)
                .ok_or_else(|| format!("invalid interval in throttle rule '{}'", s))?;
            rule = rule.with_interval(secs);
        }
        Ok(rule)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allow,
    Deny,
}

#[derive(Debug, Default)]
pub struct ThrottlePolicy {
    rules: Vec<ThrottleRule>,
    last_processed: HashMap<(String, i64), i64>,
}

impl ThrottlePolicy {
    pub fn new(rules: Vec<ThrottleRule>) -> Self {
        Self {
            rules,
            last_processed: HashMap::new(),
        }
    }

    pub fn rules(&self) -> &[ThrottleRule] {
        &self.rules
    }

    /// Decide whether a sighting is processed, recording it when allowed
    pub fn admit(&mut self, identifier: &str, message_type: Option<i64>, now: i64) -> ThrottleDecision {
        let Some(message_type) = message_type else {
            return ThrottleDecision::Allow;
        };

        let matching: Vec<&ThrottleRule> = self
            .rules
            .iter()
            .filter(|r| r.matches(identifier, message_type))
            .collect();
        if matching.is_empty() {
            return ThrottleDecision::Allow;
        }

        let key = (identifier.to_string(), message_type);
        if let Some(&last) = self.last_processed.get(&key) {
            // A clock that stepped backwards counts as elapsed
            if now >= last && matching.iter().any(|r| now - last < r.interval_secs) {
                return ThrottleDecision::Deny;
            }
        }

        self.last_processed.insert(key, now);
        ThrottleDecision::Allow
    }

    /// Last admitted time for a pair, if any rule ever matched it
    pub fn last_processed_at(&self, identifier: &str, message_type: i64) -> Option<i64> {
        self.last_processed
            .get(&(identifier.to_string(), message_type))
            .copied()
    }
}
