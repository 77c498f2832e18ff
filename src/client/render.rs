use std::fmt::Write;

use crate::models::DiagnosticReport;

const DISCLAIMER: &str = "This report was generated by an AI system and is intended to support, not replace, review by a qualified radiologist.";

/// 将诊断报告渲染为纯文本
pub fn render_report(report: &DiagnosticReport) -> String {
    let mut out = String::new();
    let rule = "=".repeat(60);

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "X-RAY DIAGNOSTIC REPORT");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Report ID:   {}", report.id);
    let _ = writeln!(
        out,
        "Generated:   {}",
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "Image:       {}", report.image_url);
    let _ = writeln!(out, "Image type:  {}", report.metadata.image_type);
    let _ = writeln!(out, "AI model:    {}", report.metadata.ai_model);
    let _ = writeln!(out, "Processing:  {}s", report.metadata.processing_time);
    let _ = writeln!(out, "Confidence:  {}%", report.findings.confidence);

    let _ = writeln!(out, "\nOVERVIEW");
    let _ = writeln!(out, "{}", report.findings.overview);

    let _ = writeln!(out, "\nFINDINGS");
    for (i, finding) in report.findings.detailed.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, finding);
    }

    let _ = writeln!(out, "\nRECOMMENDATIONS");
    for (i, recommendation) in report.findings.recommendations.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, recommendation);
    }

    let _ = writeln!(out, "\n{}", DISCLAIMER);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Findings, ReportMetadata};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_render_report() {
        let report = DiagnosticReport {
            id: "report_a1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap(),
            image_url: "/api/images/a1.png".to_string(),
            findings: Findings {
                overview: "No acute findings.".to_string(),
                detailed: vec!["Lungs clear".to_string(), "Normal heart size".to_string()],
                recommendations: vec!["Routine follow up".to_string()],
                confidence: 88,
            },
            metadata: ReportMetadata {
                image_type: "PNG".to_string(),
                processing_time: 4,
                ai_model: "Claude Sonnet 4 (Vision)".to_string(),
            },
        };

        let text = render_report(&report);
        assert!(text.contains("Report ID:   report_a1"));
        assert!(text.contains("Generated:   2025-03-01 08:30:00 UTC"));
        assert!(text.contains("Confidence:  88%"));
        assert!(text.contains("  1. Lungs clear\n  2. Normal heart size"));
        assert!(text.contains("RECOMMENDATIONS\n  1. Routine follow up"));
        assert!(text.trim_end().ends_with(DISCLAIMER));
    }
}
