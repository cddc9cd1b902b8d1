//! Risk detection and complexity tiering.
//!
//! The score is a pure function of the answer map: a base of
//! [`BASE_SCORE`] plus a fixed weight per risk indicator. Bands map the score
//! to one of five tiers, and each tier unlocks a prefix-closed list of
//! document sections.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::answers::AnswerMap;

/// Well-known answer keys inspected for risk indicators.
pub mod keys {
    pub const PII: &str = "privacy.pii";
    pub const PHI: &str = "privacy.phi";
    pub const REGULATIONS: &str = "privacy.regulations";
    pub const REGIONS: &str = "deployment.regions";
    pub const MULTI_REGION: &str = "deployment.multi_region";
    pub const PAYMENTS: &str = "payments.enabled";
    pub const SLA: &str = "operations.sla";
    pub const SCALE: &str = "architecture.scale";
    pub const EXPECTED_USERS: &str = "architecture.expected_users";
    pub const TENANCY: &str = "architecture.tenancy";
    pub const INDUSTRY: &str = "project.industry";
    pub const INTEGRATIONS: &str = "integrations.external";
}

pub const BASE_SCORE: u32 = 4;

const WEIGHT_PII: u32 = 6;
const WEIGHT_PHI: u32 = 8;
const WEIGHT_COMPLIANCE: u32 = 8;
const WEIGHT_MULTI_REGION: u32 = 5;
const WEIGHT_PAYMENTS: u32 = 7;
const WEIGHT_HIGH_AVAILABILITY: u32 = 5;
const WEIGHT_LARGE_SCALE: u32 = 6;
const WEIGHT_MULTI_TENANT: u32 = 5;
const WEIGHT_REGULATED_INDUSTRY: u32 = 7;
const WEIGHT_PER_INTEGRATION: u32 = 2;

const HIGH_AVAILABILITY_SLA: f64 = 99.9;
const LARGE_SCALE_USERS: f64 = 100_000.0;

/// Compliance regimes recognized in the regulations answer, normalized to
/// lowercase alphanumerics.
const COMPLIANCE_CODES: &[&str] = &[
    "gdpr", "ccpa", "hipaa", "pcidss", "sox", "soc2", "iso27001", "fedramp", "ferpa", "glba",
];

/// Regimes that only apply inside a regulated sector.
const SECTOR_CODES: &[&str] = &["hipaa", "pcidss", "sox", "fedramp", "ferpa", "glba"];

const REGULATED_INDUSTRIES: &[&str] = &[
    "healthcare",
    "finance",
    "financial_services",
    "fintech",
    "banking",
    "insurance",
    "government",
    "defense",
    "education",
    "pharma",
];

const LARGE_SCALES: &[&str] = &["large", "massive", "global"];

/// Graduated complexity tiers, ordered from least to most demanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Base,
    Minimal,
    Standard,
    Comprehensive,
    Enterprise,
}

impl ComplexityLevel {
    pub const ALL: [ComplexityLevel; 5] = [
        ComplexityLevel::Base,
        ComplexityLevel::Minimal,
        ComplexityLevel::Standard,
        ComplexityLevel::Comprehensive,
        ComplexityLevel::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityLevel::Base => "base",
            ComplexityLevel::Minimal => "minimal",
            ComplexityLevel::Standard => "standard",
            ComplexityLevel::Comprehensive => "comprehensive",
            ComplexityLevel::Enterprise => "enterprise",
        }
    }

    /// Answers required before a document at this tier is considered complete.
    pub fn min_fields(&self) -> usize {
        match self {
            ComplexityLevel::Base => 5,
            ComplexityLevel::Minimal => 10,
            ComplexityLevel::Standard => 18,
            ComplexityLevel::Comprehensive => 28,
            ComplexityLevel::Enterprise => 40,
        }
    }

    /// Lowest score that lands in this tier.
    pub fn threshold(&self) -> u32 {
        match self {
            ComplexityLevel::Base => 0,
            ComplexityLevel::Minimal => 10,
            ComplexityLevel::Standard => 20,
            ComplexityLevel::Comprehensive => 35,
            ComplexityLevel::Enterprise => 48,
        }
    }
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplexityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComplexityLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown complexity level: {}", s))
    }
}

/// Document sections in disclosure order, each tagged with the tier that
/// first unlocks it. A tier sees every section at or below it, so higher
/// tiers extend lower ones without reordering.
const SECTIONS: &[(&str, ComplexityLevel)] = &[
    ("overview", ComplexityLevel::Base),
    ("goals", ComplexityLevel::Base),
    ("architecture", ComplexityLevel::Base),
    ("data_model", ComplexityLevel::Minimal),
    ("api_design", ComplexityLevel::Minimal),
    ("security", ComplexityLevel::Standard),
    ("testing", ComplexityLevel::Standard),
    ("deployment", ComplexityLevel::Standard),
    ("privacy", ComplexityLevel::Comprehensive),
    ("compliance", ComplexityLevel::Comprehensive),
    ("observability", ComplexityLevel::Comprehensive),
    ("performance", ComplexityLevel::Comprehensive),
    ("disaster_recovery", ComplexityLevel::Enterprise),
    ("multi_tenancy", ComplexityLevel::Enterprise),
    ("governance", ComplexityLevel::Enterprise),
    ("risk_register", ComplexityLevel::Enterprise),
];

pub fn sections_for_level(level: ComplexityLevel) -> Vec<&'static str> {
    SECTIONS
        .iter()
        .filter(|(_, unlocked_at)| *unlocked_at <= level)
        .map(|(name, _)| *name)
        .collect()
}

pub fn meets_minimum_fields(level: ComplexityLevel, answer_count: usize) -> bool {
    answer_count >= level.min_fields()
}

/// Derived risk signals. Recomputed from the answers on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub handles_pii: bool,
    pub handles_phi: bool,
    pub requires_compliance: bool,
    pub multi_region: bool,
    pub handles_payments: bool,
    pub high_availability: bool,
    pub large_scale: bool,
    pub multi_tenant: bool,
    pub regulated_industry: bool,
    pub external_integrations: usize,
}

fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn normalize_choice(value: &str) -> String {
    value.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

pub fn detect_risk_factors(answers: &AnswerMap) -> RiskFactors {
    let regulations: Vec<String> = answers
        .as_list(keys::REGULATIONS)
        .iter()
        .map(|code| normalize_code(code))
        .collect();
    let has_code = |code: &str| regulations.iter().any(|r| r == code);
    let sector_regulated = SECTOR_CODES.iter().any(|code| has_code(*code));

    let industry_regulated = answers
        .as_text(keys::INDUSTRY)
        .map(|industry| REGULATED_INDUSTRIES.contains(&normalize_choice(industry).as_str()))
        .unwrap_or(false);

    let large_scale = answers
        .as_text(keys::SCALE)
        .map(|scale| LARGE_SCALES.contains(&normalize_choice(scale).as_str()))
        .unwrap_or(false)
        || answers
            .as_number(keys::EXPECTED_USERS)
            .map(|users| users >= LARGE_SCALE_USERS)
            .unwrap_or(false);

    RiskFactors {
        handles_pii: answers.as_bool(keys::PII).unwrap_or(false),
        handles_phi: answers.as_bool(keys::PHI).unwrap_or(false) || has_code("hipaa"),
        requires_compliance: COMPLIANCE_CODES.iter().any(|code| has_code(*code)),
        multi_region: answers.as_bool(keys::MULTI_REGION).unwrap_or(false)
            || answers.as_list(keys::REGIONS).len() > 1,
        handles_payments: answers.as_bool(keys::PAYMENTS).unwrap_or(false) || has_code("pcidss"),
        high_availability: answers
            .as_number(keys::SLA)
            .map(|sla| sla >= HIGH_AVAILABILITY_SLA)
            .unwrap_or(false),
        large_scale,
        multi_tenant: answers
            .as_text(keys::TENANCY)
            .map(|tenancy| normalize_choice(tenancy) == "multi_tenant")
            .unwrap_or(false),
        regulated_industry: industry_regulated || sector_regulated,
        external_integrations: answers.as_list(keys::INTEGRATIONS).len(),
    }
}

/// One contribution to the score, kept for an auditable trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: String,
    pub points: u32,
    pub note: String,
}

pub fn score_components(factors: &RiskFactors) -> Vec<ScoreComponent> {
    let flags: [(bool, &str, u32, &str); 9] = [
        (factors.handles_pii, "handles_pii", WEIGHT_PII, "personal data is collected"),
        (factors.handles_phi, "handles_phi", WEIGHT_PHI, "protected health information"),
        (
            factors.requires_compliance,
            "requires_compliance",
            WEIGHT_COMPLIANCE,
            "compliance obligations declared",
        ),
        (
            factors.multi_region,
            "multi_region",
            WEIGHT_MULTI_REGION,
            "deployed across multiple regions",
        ),
        (
            factors.handles_payments,
            "handles_payments",
            WEIGHT_PAYMENTS,
            "payment flows in scope",
        ),
        (
            factors.high_availability,
            "high_availability",
            WEIGHT_HIGH_AVAILABILITY,
            "availability target of 99.9% or higher",
        ),
        (factors.large_scale, "large_scale", WEIGHT_LARGE_SCALE, "large user base"),
        (
            factors.multi_tenant,
            "multi_tenant",
            WEIGHT_MULTI_TENANT,
            "shared multi-tenant infrastructure",
        ),
        (
            factors.regulated_industry,
            "regulated_industry",
            WEIGHT_REGULATED_INDUSTRY,
            "operates in a regulated industry",
        ),
    ];

    let mut components: Vec<ScoreComponent> = flags
        .into_iter()
        .filter(|(present, ..)| *present)
        .map(|(_, factor, points, note)| ScoreComponent {
            factor: factor.to_string(),
            points,
            note: note.to_string(),
        })
        .collect();

    if factors.external_integrations > 0 {
        components.push(ScoreComponent {
            factor: "external_integrations".to_string(),
            points: WEIGHT_PER_INTEGRATION * factors.external_integrations as u32,
            note: format!("{} external integration(s)", factors.external_integrations),
        });
    }

    components
}

pub fn score(factors: &RiskFactors) -> u32 {
    BASE_SCORE
        + score_components(factors)
            .iter()
            .map(|c| c.points)
            .sum::<u32>()
}

/// Highest band whose inclusive lower bound the score reaches.
pub fn recommend_level(score: u32) -> ComplexityLevel {
    ComplexityLevel::ALL
        .into_iter()
        .rev()
        .find(|level| score >= level.threshold())
        .unwrap_or(ComplexityLevel::Base)
}

/// Full analysis of an answer map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityAssessment {
    pub score: u32,
    pub level: ComplexityLevel,
    pub factors: RiskFactors,
    pub components: Vec<ScoreComponent>,
}

impl ComplexityAssessment {
    pub fn sections(&self) -> Vec<&'static str> {
        sections_for_level(self.level)
    }
}

pub fn assess(answers: &AnswerMap) -> ComplexityAssessment {
    let factors = detect_risk_factors(answers);
    let components = score_components(&factors);
    let score = BASE_SCORE + components.iter().map(|c| c.points).sum::<u32>();
    ComplexityAssessment {
        score,
        level: recommend_level(score),
        factors,
        components,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::AnswerValue;

    #[test]
    fn test_empty_answers_score_base() {
        let assessment = assess(&AnswerMap::new());
        assert_eq!(assessment.score, BASE_SCORE);
        assert_eq!(assessment.level, ComplexityLevel::Base);
        assert!(assessment.components.is_empty());
    }

    #[test]
    fn test_band_boundaries_are_inclusive() {
        assert_eq!(recommend_level(9), ComplexityLevel::Base);
        assert_eq!(recommend_level(10), ComplexityLevel::Minimal);
        assert_eq!(recommend_level(19), ComplexityLevel::Minimal);
        assert_eq!(recommend_level(20), ComplexityLevel::Standard);
        assert_eq!(recommend_level(34), ComplexityLevel::Standard);
        assert_eq!(recommend_level(35), ComplexityLevel::Comprehensive);
        assert_eq!(recommend_level(47), ComplexityLevel::Comprehensive);
        assert_eq!(recommend_level(48), ComplexityLevel::Enterprise);
        assert_eq!(recommend_level(500), ComplexityLevel::Enterprise);
    }

    #[test]
    fn test_regulated_health_data_reaches_comprehensive() {
        let mut answers = AnswerMap::new();
        answers.insert(keys::PII, true);
        answers.insert(keys::REGULATIONS, AnswerValue::list(["hipaa", "gdpr"]));
        answers.insert(keys::SLA, "99.99");

        let assessment = assess(&answers);
        assert!(assessment.factors.handles_phi);
        assert!(assessment.factors.requires_compliance);
        assert!(assessment.factors.high_availability);
        assert!(assessment.score >= 35, "score was {}", assessment.score);
        assert!(assessment.level >= ComplexityLevel::Comprehensive);
    }

    #[test]
    fn test_weights_per_indicator() {
        let factors = RiskFactors {
            handles_payments: true,
            multi_tenant: true,
            external_integrations: 3,
            ..Default::default()
        };
        assert_eq!(score(&factors), BASE_SCORE + 7 + 5 + 6);
    }

    #[test]
    fn test_detects_scale_tenancy_and_regions() {
        let mut answers = AnswerMap::new();
        answers.insert(keys::EXPECTED_USERS, 250_000.0);
        answers.insert(keys::TENANCY, "Multi-Tenant");
        answers.insert(keys::REGIONS, AnswerValue::list(["us-east", "eu-west"]));
        answers.insert(keys::INDUSTRY, "Financial Services");
        answers.insert(keys::REGULATIONS, AnswerValue::list(["PCI-DSS"]));

        let factors = detect_risk_factors(&answers);
        assert!(factors.large_scale);
        assert!(factors.multi_tenant);
        assert!(factors.multi_region);
        assert!(factors.regulated_industry);
        assert!(factors.handles_payments);
        assert!(!factors.handles_pii);
    }

    #[test]
    fn test_sections_are_prefix_closed() {
        for pair in ComplexityLevel::ALL.windows(2) {
            let lower = sections_for_level(pair[0]);
            let higher = sections_for_level(pair[1]);
            assert!(higher.len() > lower.len());
            assert_eq!(&higher[..lower.len()], lower.as_slice());
        }
    }

    #[test]
    fn test_minimum_fields() {
        assert!(!meets_minimum_fields(ComplexityLevel::Standard, 17));
        assert!(meets_minimum_fields(ComplexityLevel::Standard, 18));
        assert!(meets_minimum_fields(ComplexityLevel::Base, 5));
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!(
            "Enterprise".parse::<ComplexityLevel>(),
            Ok(ComplexityLevel::Enterprise)
        );
        assert!("huge".parse::<ComplexityLevel>().is_err());
    }
}
