//! Deterministic post-processing of model output: topic tagging,
//! follow-up question suggestion, and a retrieval-based confidence hint.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::RetrievalConfig;

/// A topic tag with its trigger pattern.
///
/// Rules are tested independently against the response text; a response
/// may match none or several. Adding a topic means adding a row here, not
/// a new branch.
struct TopicRule {
    topic: &'static str,
    pattern: Regex,
}

fn topic_rules() -> &'static [TopicRule] {
    static RULES: OnceLock<Vec<TopicRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let rule = |topic, pattern: &str| TopicRule {
            topic,
            pattern: Regex::new(pattern).expect("hard-coded topic pattern is valid"),
        };
        vec![
            rule("housing", r"(?i)housing|rent|affordable"),
            rule("safety", r"(?i)safety|crime|security"),
            rule("transportation", r"(?i)transit|commute|bus|subway|route"),
            rule("finance", r"(?i)funding|budget|money|grants"),
            rule("health", r"(?i)mental health|counseling|well-being"),
        ]
    })
}

/// A follow-up suggestion rule.
///
/// Fires when either the query pattern or the response pattern matches,
/// contributing both candidate questions. Rules are evaluated in
/// declaration order so output is reproducible.
struct FollowUpRule {
    query_pattern: Regex,
    response_pattern: Regex,
    questions: [&'static str; 2],
}

fn follow_up_rules() -> &'static [FollowUpRule] {
    static RULES: OnceLock<Vec<FollowUpRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let rule = |query: &str, response: &str, questions| FollowUpRule {
            query_pattern: Regex::new(query).expect("hard-coded query pattern is valid"),
            response_pattern: Regex::new(response).expect("hard-coded response pattern is valid"),
            questions,
        };
        vec![
            rule(
                r"(?i)safety|crime|security",
                r"(?i)suspicious|concerns",
                [
                    "Would you like to see statistics on crime rates?",
                    "Are there community-led initiatives addressing this?",
                ],
            ),
            rule(
                r"(?i)solutions|ideas|plans",
                r"(?i)recommendations|proposed solutions",
                [
                    "What solutions have been effective in similar communities?",
                    "Are there any government-led safety programs?",
                ],
            ),
            rule(
                r"(?i)budget|funding|money|cost of living|rent|affordable housing",
                r"(?i)financial support|grants|housing options|eviction",
                [
                    "How is this initiative being funded?",
                    "Do you need help finding affordable housing?",
                ],
            ),
            rule(
                r"(?i)transportation|transit|bus|subway|commute",
                r"(?i)public transit|route|schedule|accessibility",
                [
                    "Would you like to view local transit schedules?",
                    "Do you want tips for commuting or discounted transit passes?",
                ],
            ),
        ]
    })
}

/// Generic suggestions returned when no rule fires
const FALLBACK_QUESTIONS: [&str; 2] = [
    "What more would you like to know?",
    "Would you like updates on this topic?",
];

/// Derived enrichment for a completed exchange
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub topics: Vec<String>,
    pub follow_ups: Vec<String>,
    pub confidence: f64,
}

/// Enricher applying the declarative rule tables plus the confidence
/// policy from configuration.
#[derive(Debug, Clone)]
pub struct ResponseEnricher {
    high_confidence: f64,
    low_confidence: f64,
    confidence_cutoff: usize,
}

impl ResponseEnricher {
    #[must_use]
    pub fn new(policy: &RetrievalConfig) -> Self {
        Self {
            high_confidence: policy.high_confidence,
            low_confidence: policy.low_confidence,
            confidence_cutoff: policy.confidence_cutoff,
        }
    }

    /// Extract topic tags from response text.
    ///
    /// Pure function of the response text; tags appear in rule-table order.
    #[must_use]
    pub fn extract_topics(response: &str) -> Vec<String> {
        topic_rules()
            .iter()
            .filter(|rule| rule.pattern.is_match(response))
            .map(|rule| rule.topic.to_string())
            .collect()
    }

    /// Suggest follow-up questions for a query/response pair.
    ///
    /// All firing rules contribute both their questions in declaration
    /// order; if none fire, exactly the two generic fallback questions are
    /// returned.
    #[must_use]
    pub fn follow_up_questions(query: &str, response: &str) -> Vec<String> {
        let suggestions: Vec<String> = follow_up_rules()
            .iter()
            .filter(|rule| {
                rule.query_pattern.is_match(query) || rule.response_pattern.is_match(response)
            })
            .flat_map(|rule| rule.questions.iter().map(ToString::to_string))
            .collect();

        if suggestions.is_empty() {
            FALLBACK_QUESTIONS.iter().map(ToString::to_string).collect()
        } else {
            suggestions
        }
    }

    /// Two-level confidence from retrieval yield.
    ///
    /// A placeholder policy, not a calibrated probability: it ignores the
    /// actual similarity scores and any model-reported confidence.
    #[must_use]
    pub fn confidence(&self, retrieved_count: usize) -> f64 {
        if retrieved_count >= self.confidence_cutoff {
            self.high_confidence
        } else {
            self.low_confidence
        }
    }

    /// Derive topics, follow-ups and confidence for a completed exchange
    #[must_use]
    pub fn enrich(&self, query: &str, response: &str, retrieved_count: usize) -> Enrichment {
        Enrichment {
            topics: Self::extract_topics(response),
            follow_ups: Self::follow_up_questions(query, response),
            confidence: self.confidence(retrieved_count),
        }
    }
}

impl Default for ResponseEnricher {
    fn default() -> Self {
        Self::new(&RetrievalConfig::default())
    }
}
