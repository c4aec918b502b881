//! Canonical mention shape and match results.

use serde::{Deserialize, Serialize};

/// Which matcher stage produced a [`MatchResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Fuzzy,
    Typo,
    Keyword,
    Context,
    None,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::Exact => write!(f, "exact"),
            MatchType::Fuzzy => write!(f, "fuzzy"),
            MatchType::Typo => write!(f, "typo"),
            MatchType::Keyword => write!(f, "keyword"),
            MatchType::Context => write!(f, "context"),
            MatchType::None => write!(f, "none"),
        }
    }
}

/// Outcome of matching one text against one brand profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub is_match: bool,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    pub match_type: MatchType,
    pub matched_term: Option<String>,
    pub reason: Option<String>,
}

impl MatchResult {
    #[must_use]
    pub fn hit(
        match_type: MatchType,
        confidence: f64,
        term: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            is_match: true,
            confidence: confidence.clamp(0.0, 1.0),
            match_type,
            matched_term: Some(term.into()),
            reason: Some(reason.into()),
        }
    }

    #[must_use]
    pub fn miss(reason: Option<String>) -> Self {
        Self {
            is_match: false,
            confidence: 0.0,
            match_type: MatchType::None,
            matched_term: None,
            reason,
        }
    }
}

/// Match diagnostics attached to a mention after the matcher ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDiagnostics {
    pub confidence: f64,
    pub match_type: MatchType,
    pub matched_term: Option<String>,
    pub reason: Option<String>,
}

impl From<&MatchResult> for MatchDiagnostics {
    fn from(result: &MatchResult) -> Self {
        Self {
            confidence: result.confidence,
            match_type: result.match_type,
            matched_term: result.matched_term.clone(),
            reason: result.reason.clone(),
        }
    }
}

/// Marks a mention that was collected because a brand tracks a competitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorTag {
    pub is_competitor: bool,
    pub competitor_id: String,
    pub competitor_name: String,
}

/// Optional annotations carried alongside a mention.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MentionMetadata {
    pub author: Option<String>,
    pub url: Option<String>,
    /// Provider payload the mention was normalized from.
    pub raw: Option<serde_json::Value>,
    pub synthetic: bool,
    #[serde(rename = "match")]
    pub match_info: Option<MatchDiagnostics>,
    pub competitor: Option<CompetitorTag>,
}

/// A provider item in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMention {
    pub id: String,
    /// Brand name the mention is attributed to.
    pub brand: String,
    pub text: String,
    /// Publication time in epoch milliseconds.
    pub timestamp: i64,
    /// Platform of the provider that supplied the mention.
    pub source: String,
    pub metadata: MentionMetadata,
}

impl NormalizedMention {
    #[must_use]
    pub fn is_competitor(&self) -> bool {
        self.metadata
            .competitor
            .as_ref()
            .is_some_and(|tag| tag.is_competitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_type_display() {
        assert_eq!(MatchType::Exact.to_string(), "exact");
        assert_eq!(MatchType::None.to_string(), "none");
    }

    #[test]
    fn hit_clamps_confidence() {
        let result = MatchResult::hit(MatchType::Exact, 1.4, "acme", "exact");
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
        assert!(result.is_match);
    }

    #[test]
    fn metadata_serializes_match_under_match_key() {
        let metadata = MentionMetadata {
            match_info: Some(MatchDiagnostics::from(&MatchResult::hit(
                MatchType::Keyword,
                0.95,
                "acme widgets",
                "keyword match",
            ))),
            ..MentionMetadata::default()
        };
        let json = serde_json::to_value(&metadata).expect("serialize");
        assert_eq!(json["match"]["match_type"], "keyword");
        assert!(json["competitor"].is_null());
    }

    #[test]
    fn competitor_flag_reads_tag() {
        let mut mention = NormalizedMention {
            id: "1".to_string(),
            brand: "Acme".to_string(),
            text: "Globex ships".to_string(),
            timestamp: 1,
            source: "reddit".to_string(),
            metadata: MentionMetadata::default(),
        };
        assert!(!mention.is_competitor());
        mention.metadata.competitor = Some(CompetitorTag {
            is_competitor: true,
            competitor_id: "globex".to_string(),
            competitor_name: "Globex".to_string(),
        });
        assert!(mention.is_competitor());
    }
}
