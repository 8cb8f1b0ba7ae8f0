//! Confidence scoring from accepted evidence.

use crate::types::RetrievedPassage;

/// Mean similarity of the scored passages, clamped to [0, 1] and rounded
/// to 3 decimals. Passages without a score are ignored; no scores at all
/// gives 0.0.
///
/// Streaming and synchronous answers both use this, so they agree for the
/// same accepted passages.
pub fn score(passages: &[RetrievedPassage]) -> f64 {
    let scores: Vec<f64> = passages
        .iter()
        .filter_map(|p| p.score)
        .map(f64::from)
        .collect();

    if scores.is_empty() {
        return 0.0;
    }

    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    round3(mean.clamp(0.0, 1.0))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Two-decimal rendering used in user-facing output.
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.2}", confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(scores: &[f32]) -> Vec<RetrievedPassage> {
        scores
            .iter()
            .map(|s| RetrievedPassage::new("x").with_score(*s))
            .collect()
    }

    #[test]
    fn test_mean_of_scores() {
        assert_eq!(score(&scored(&[0.4, 0.36])), 0.38);
        assert_eq!(score(&scored(&[0.9])), 0.9);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(score(&scored(&[-0.2, 1.4])), 0.6);
        assert_eq!(score(&scored(&[1.4, 1.6])), 1.0);
        assert_eq!(score(&scored(&[-0.5, -0.1])), 0.0);
    }

    #[test]
    fn test_unscored_passages_are_ignored() {
        let mut passages = scored(&[0.8]);
        passages.push(RetrievedPassage::new("no score"));
        assert_eq!(score(&passages), 0.8);

        assert_eq!(score(&[RetrievedPassage::new("no score")]), 0.0);
        assert_eq!(score(&[]), 0.0);
    }

    #[test]
    fn test_rounds_to_three_decimals() {
        assert_eq!(score(&scored(&[0.5, 0.5, 0.6])), 0.533);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_confidence(0.0), "0.00");
        assert_eq!(format_confidence(0.38), "0.38");
        assert_eq!(format_confidence(1.0), "1.00");
    }
}
