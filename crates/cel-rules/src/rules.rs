//! Stored reward rules and their evaluation.
//!
//! A [`Rule`] pairs a boolean expression over an order document with a
//! [`RewardPolicy`]. The [`RuleEngine`] compiles each rule's expression once
//! and reports, per rule, whether it matched and what it pays.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::ProgramCache;
use crate::diagnostic::CompileError;
use crate::env::Env;
use crate::eval::{EvalError, Value};

/// Field of the order document a percentage reward is computed from.
pub const DEFAULT_REWARD_BASE: &str = "totalAmount";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewardType {
    /// `base * multiplier`, optionally capped.
    Percentage,
    FixedAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardPolicy {
    pub reward_type: RewardType,
    #[serde(default)]
    pub multiplier: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_amount: Option<f64>,
}

impl RewardPolicy {
    pub fn percentage(multiplier: f64, max_cap: Option<f64>) -> Self {
        Self {
            reward_type: RewardType::Percentage,
            multiplier,
            max_cap,
            fixed_amount: None,
        }
    }

    pub fn fixed(amount: f64) -> Self {
        Self {
            reward_type: RewardType::FixedAmount,
            multiplier: 0.0,
            max_cap: None,
            fixed_amount: Some(amount),
        }
    }

    /// Reward paid for an order whose base amount is `base`. Never negative.
    pub fn reward_for(&self, base: f64) -> f64 {
        let reward = match self.reward_type {
            RewardType::Percentage => {
                let raw = base * self.multiplier;
                match self.max_cap {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            RewardType::FixedAmount => self.fixed_amount.unwrap_or(0.0),
        };
        reward.max(0.0)
    }
}

/// A persisted rule record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cel_expression: String,
    #[serde(flatten)]
    pub reward: RewardPolicy,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Rule {
    pub fn new(name: impl Into<String>, cel_expression: impl Into<String>, reward: RewardPolicy) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            cel_expression: cel_expression.into(),
            reward,
            active: true,
        }
    }
}

/// What happened when one rule was evaluated against one document.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    Matched { reward: f64 },
    NotMatched,
    /// The expression does not compile.
    Invalid(CompileError),
    /// Evaluation faulted, or the expression did not produce a bool.
    Faulted(EvalError),
}

impl RuleOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, RuleOutcome::Matched { .. })
    }

    pub fn reward(&self) -> Option<f64> {
        match self {
            RuleOutcome::Matched { reward } => Some(*reward),
            _ => None,
        }
    }
}

/// A rule together with its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleReport<'r> {
    pub rule: &'r Rule,
    pub outcome: RuleOutcome,
}

pub struct RuleEngine {
    cache: ProgramCache,
    reward_base: String,
}

impl RuleEngine {
    pub fn new(env: Arc<Env>) -> Self {
        Self {
            cache: ProgramCache::new(env),
            reward_base: DEFAULT_REWARD_BASE.to_string(),
        }
    }

    /// Uses another top-level document field as the percentage base.
    pub fn with_reward_base(mut self, field: impl Into<String>) -> Self {
        self.reward_base = field.into();
        self
    }

    pub fn cache(&self) -> &ProgramCache {
        &self.cache
    }

    /// Evaluates one rule. Inactive rules are evaluated all the same.
    pub fn evaluate(&self, rule: &Rule, document: &Value) -> RuleOutcome {
        let program = match self.cache.get_or_compile(&rule.cel_expression) {
            Ok(program) => program,
            Err(err) => {
                warn!(rule = %rule.name, error = %err, "rule does not compile");
                return RuleOutcome::Invalid(err);
            }
        };

        let outcome = match program.eval_document(document) {
            Ok(Value::Bool(true)) => RuleOutcome::Matched {
                reward: rule.reward.reward_for(self.reward_base(document)),
            },
            Ok(Value::Bool(false)) => RuleOutcome::NotMatched,
            Ok(other) => RuleOutcome::Faulted(EvalError::unexpected_kind("bool", other.kind_name())),
            Err(err) => RuleOutcome::Faulted(err),
        };

        match &outcome {
            RuleOutcome::Faulted(err) => warn!(rule = %rule.name, error = %err, "rule evaluation failed"),
            RuleOutcome::Matched { reward } => debug!(rule = %rule.name, reward, "rule matched"),
            _ => debug!(rule = %rule.name, "rule did not match"),
        }
        outcome
    }

    /// Evaluates every active rule, in order.
    pub fn evaluate_all<'r>(&self, rules: &'r [Rule], document: &Value) -> Vec<RuleReport<'r>> {
        rules
            .iter()
            .filter(|rule| rule.active)
            .map(|rule| RuleReport {
                rule,
                outcome: self.evaluate(rule, document),
            })
            .collect()
    }

    fn reward_base(&self, document: &Value) -> f64 {
        document
            .as_map()
            .and_then(|map| map.get(&self.reward_base))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::normalize;
    use crate::diagnostic::DiagnosticKind;
    use crate::eval::EvalErrorKind;
    use crate::types::CelType;
    use serde_json::json;

    fn engine() -> RuleEngine {
        let env = Env::with_standard_library()
            .with_variable("totalAmount", CelType::Int)
            .and_then(|env| env.with_variable("sponsorCode", CelType::String))
            .and_then(|env| env.with_variable("items", CelType::Dyn))
            .unwrap();
        RuleEngine::new(Arc::new(env))
    }

    fn order() -> Value {
        normalize(&json!({
            "totalAmount": 750000,
            "sponsorCode": "AUTO2000",
            "items": [{"sku": "OLI123", "quantity": 2}]
        }))
    }

    #[test]
    fn percentage_reward_is_capped() {
        let policy = RewardPolicy::percentage(0.1, Some(50000.0));
        assert_eq!(policy.reward_for(100000.0), 10000.0);
        assert_eq!(policy.reward_for(750000.0), 50000.0);
        assert_eq!(RewardPolicy::percentage(0.1, None).reward_for(750000.0), 75000.0);
    }

    #[test]
    fn fixed_reward_ignores_base() {
        assert_eq!(RewardPolicy::fixed(5000.0).reward_for(1.0), 5000.0);
        let missing = RewardPolicy {
            fixed_amount: None,
            ..RewardPolicy::fixed(1.0)
        };
        assert_eq!(missing.reward_for(1.0), 0.0);
    }

    #[test]
    fn negative_rewards_clamp_to_zero() {
        assert_eq!(RewardPolicy::percentage(0.1, None).reward_for(-10.0), 0.0);
        assert_eq!(RewardPolicy::fixed(-1.0).reward_for(0.0), 0.0);
    }

    #[test]
    fn rule_record_uses_camel_case() {
        let rule: Rule = serde_json::from_value(json!({
            "id": 7,
            "name": "auto2000",
            "celExpression": "sponsorCode == 'AUTO2000'",
            "rewardType": "PERCENTAGE",
            "multiplier": 0.05,
            "maxCap": 20000.0
        }))
        .unwrap();
        assert_eq!(rule.id, Some(7));
        assert!(rule.active);
        assert_eq!(rule.reward, RewardPolicy::percentage(0.05, Some(20000.0)));

        let back = serde_json::to_value(&rule).unwrap();
        assert_eq!(back["celExpression"], json!("sponsorCode == 'AUTO2000'"));
        assert_eq!(back["rewardType"], json!("PERCENTAGE"));
    }

    #[test]
    fn matched_rule_pays_on_total_amount() {
        let rule = Rule::new(
            "big order",
            "sponsorCode == 'AUTO2000' && totalAmount >= 500000",
            RewardPolicy::percentage(0.1, Some(50000.0)),
        );
        let outcome = engine().evaluate(&rule, &order());
        assert_eq!(outcome, RuleOutcome::Matched { reward: 50000.0 });
    }

    #[test]
    fn unmatched_and_broken_rules() {
        let engine = engine();
        let doc = order();

        let miss = Rule::new("small", "totalAmount < 10", RewardPolicy::fixed(1.0));
        assert_eq!(engine.evaluate(&miss, &doc), RuleOutcome::NotMatched);

        let invalid = Rule::new("typo", "totalAmont > 1", RewardPolicy::fixed(1.0));
        match engine.evaluate(&invalid, &doc) {
            RuleOutcome::Invalid(err) => assert!(err.has_kind(DiagnosticKind::UnknownVariable)),
            other => panic!("expected invalid, got {:?}", other),
        }

        let fault = Rule::new("fault", "items.all(i, i.price > 0)", RewardPolicy::fixed(1.0));
        match engine.evaluate(&fault, &doc) {
            RuleOutcome::Faulted(err) => assert_eq!(err.kind, EvalErrorKind::FieldNotFound),
            other => panic!("expected fault, got {:?}", other),
        }

        let not_bool = Rule::new("amount", "totalAmount", RewardPolicy::fixed(1.0));
        match engine.evaluate(&not_bool, &doc) {
            RuleOutcome::Faulted(err) => assert_eq!(err.kind, EvalErrorKind::TypeCoercion),
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn evaluate_all_skips_inactive_rules() {
        let engine = engine();
        let mut inactive = Rule::new("off", "true", RewardPolicy::fixed(1.0));
        inactive.active = false;
        let rules = vec![
            Rule::new("on", "size(items) > 0", RewardPolicy::fixed(2500.0)),
            inactive,
        ];

        let reports = engine.evaluate_all(&rules, &order());
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].rule.name, "on");
        assert_eq!(reports[0].outcome.reward(), Some(2500.0));
        assert_eq!(engine.cache().len(), 1);
    }

    #[test]
    fn reward_base_is_configurable() {
        let engine = engine().with_reward_base("missing");
        let rule = Rule::new("pct", "true", RewardPolicy::percentage(0.5, None));
        assert_eq!(engine.evaluate(&rule, &order()), RuleOutcome::Matched { reward: 0.0 });
    }
}
