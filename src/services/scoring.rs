// PHQ-9 / GAD-7 scoring tables and risk bucketing.

use crate::models::assessment::{AssessmentResponseItem, Severity};
use serde::{Deserialize, Serialize};

pub const PHQ9_MAX_SCORE: u32 = 27;
pub const GAD7_MAX_SCORE: u32 = 21;
pub const MAX_ANSWER: u8 = 3;

pub const ANSWER_SCALE: [&str; 4] = [
    "Not at all",
    "Several days",
    "More than half the days",
    "Nearly every day",
];

pub const PHQ9_QUESTIONS: [&str; 9] = [
    "Over the last 2 weeks, how often have you been bothered by little interest or pleasure in doing things?",
    "Over the last 2 weeks, how often have you been bothered by feeling down, depressed, or hopeless?",
    "Over the last 2 weeks, how often have you been bothered by trouble falling or staying asleep, or sleeping too much?",
    "Over the last 2 weeks, how often have you been bothered by feeling tired or having little energy?",
    "Over the last 2 weeks, how often have you been bothered by poor appetite or overeating?",
    "Over the last 2 weeks, how often have you been bothered by feeling bad about yourself - or that you are a failure or have let yourself or your family down?",
    "Over the last 2 weeks, how often have you been bothered by trouble concentrating on things, such as reading the newspaper or watching television?",
    "Over the last 2 weeks, how often have you been bothered by moving or speaking so slowly that other people could have noticed, or the opposite - being so fidgety or restless that you have been moving around a lot more than usual?",
    "Over the last 2 weeks, how often have you been bothered by thoughts that you would be better off dead, or of hurting yourself in some way?",
];

pub const GAD7_QUESTIONS: [&str; 7] = [
    "Over the last 2 weeks, how often have you been bothered by feeling nervous, anxious, or on edge?",
    "Over the last 2 weeks, how often have you been bothered by not being able to stop or control worrying?",
    "Over the last 2 weeks, how often have you been bothered by worrying too much about different things?",
    "Over the last 2 weeks, how often have you been bothered by trouble relaxing?",
    "Over the last 2 weeks, how often have you been bothered by being so restless that it's hard to sit still?",
    "Over the last 2 weeks, how often have you been bothered by becoming easily annoyed or irritable?",
    "Over the last 2 weeks, how often have you been bothered by feeling afraid as if something awful might happen?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }
}

/// Result of looking a score up in a severity table.
///
/// `level` is `None` when the score falls outside the table; such scores are
/// treated as moderate risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub score: u32,
    pub level: Option<Severity>,
    pub risk: RiskLevel,
}

impl ScoreBand {
    fn new(score: u32, level: Option<Severity>) -> Self {
        let risk = match level {
            Some(Severity::Minimal) | Some(Severity::Mild) => RiskLevel::Low,
            Some(Severity::Moderate) | None => RiskLevel::Moderate,
            Some(Severity::ModeratelySevere) | Some(Severity::Severe) => RiskLevel::High,
        };
        Self { score, level, risk }
    }

    pub fn label(&self) -> &'static str {
        self.level.map(|l| l.label()).unwrap_or("unknown")
    }
}

pub fn phq9_severity(score: u32) -> ScoreBand {
    let level = match score {
        0..=4 => Some(Severity::Minimal),
        5..=9 => Some(Severity::Mild),
        10..=14 => Some(Severity::Moderate),
        15..=19 => Some(Severity::ModeratelySevere),
        20..=PHQ9_MAX_SCORE => Some(Severity::Severe),
        _ => None,
    };
    ScoreBand::new(score, level)
}

pub fn gad7_severity(score: u32) -> ScoreBand {
    let level = match score {
        0..=4 => Some(Severity::Minimal),
        5..=9 => Some(Severity::Mild),
        10..=14 => Some(Severity::Moderate),
        15..=GAD7_MAX_SCORE => Some(Severity::Severe),
        _ => None,
    };
    ScoreBand::new(score, level)
}

/// Either questionnaire high → high; else either moderate → moderate; else low.
pub fn overall_risk(phq9: RiskLevel, gad7: RiskLevel) -> RiskLevel {
    if phq9 == RiskLevel::High || gad7 == RiskLevel::High {
        RiskLevel::High
    } else if phq9 == RiskLevel::Moderate || gad7 == RiskLevel::Moderate {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

/// Overall risk when a questionnaire may not have been answered; a missing one counts as low.
pub fn overall_risk_of(phq9: Option<&ScoreBand>, gad7: Option<&ScoreBand>) -> RiskLevel {
    overall_risk(
        phq9.map(|b| b.risk).unwrap_or(RiskLevel::Low),
        gad7.map(|b| b.risk).unwrap_or(RiskLevel::Low),
    )
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AnswerError {
    #[error("{name} requires exactly {expected} answers, got {actual}")]
    WrongCount {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{name} answer {index} is {value}; answers must be between 0 and 3")]
    OutOfRange {
        name: &'static str,
        index: usize,
        value: u8,
    },
}

/// Validates a full set of answers against a question bank and returns the total.
pub fn score_answers(
    name: &'static str,
    bank: &[&str],
    answers: &[u8],
) -> Result<u32, AnswerError> {
    if answers.len() != bank.len() {
        return Err(AnswerError::WrongCount {
            name,
            expected: bank.len(),
            actual: answers.len(),
        });
    }
    if let Some((index, value)) = answers
        .iter()
        .enumerate()
        .find(|(_, v)| **v > MAX_ANSWER)
    {
        return Err(AnswerError::OutOfRange {
            name,
            index: index + 1,
            value: *value,
        });
    }
    Ok(answers.iter().map(|a| u32::from(*a)).sum())
}

/// Pairs each answer with its question for persistence, ids like `phq9_q1`.
pub fn response_items(prefix: &str, bank: &[&str], answers: &[u8]) -> Vec<AssessmentResponseItem> {
    bank.iter()
        .zip(answers)
        .enumerate()
        .map(|(i, (question, answer))| AssessmentResponseItem {
            question_id: format!("{}_q{}", prefix, i + 1),
            question: question.to_string(),
            answer: *answer,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phq9_table() {
        assert_eq!(phq9_severity(0).level, Some(Severity::Minimal));
        assert_eq!(phq9_severity(4).level, Some(Severity::Minimal));
        assert_eq!(phq9_severity(5).level, Some(Severity::Mild));
        assert_eq!(phq9_severity(8).level, Some(Severity::Mild));
        assert_eq!(phq9_severity(10).level, Some(Severity::Moderate));
        assert_eq!(phq9_severity(14).risk, RiskLevel::Moderate);
        assert_eq!(phq9_severity(15).level, Some(Severity::ModeratelySevere));
        assert_eq!(phq9_severity(15).risk, RiskLevel::High);
        assert_eq!(phq9_severity(20).level, Some(Severity::Severe));
        assert_eq!(phq9_severity(27).level, Some(Severity::Severe));
    }

    #[test]
    fn test_gad7_table() {
        assert_eq!(gad7_severity(3).level, Some(Severity::Minimal));
        assert_eq!(gad7_severity(9).risk, RiskLevel::Low);
        assert_eq!(gad7_severity(12).level, Some(Severity::Moderate));
        assert_eq!(gad7_severity(15).level, Some(Severity::Severe));
        assert_eq!(gad7_severity(21).risk, RiskLevel::High);
    }

    #[test]
    fn test_out_of_table_scores_are_unknown_moderate() {
        let band = phq9_severity(28);
        assert_eq!(band.level, None);
        assert_eq!(band.label(), "unknown");
        assert_eq!(band.risk, RiskLevel::Moderate);

        // 22 is severe on PHQ-9 but outside the GAD-7 table
        assert_eq!(gad7_severity(22).level, None);
        assert_eq!(phq9_severity(22).level, Some(Severity::Severe));
    }

    #[test]
    fn test_overall_risk() {
        use RiskLevel::*;
        assert_eq!(overall_risk(High, Low), High);
        assert_eq!(overall_risk(Low, High), High);
        assert_eq!(overall_risk(Moderate, High), High);
        assert_eq!(overall_risk(Moderate, Low), Moderate);
        assert_eq!(overall_risk(Low, Moderate), Moderate);
        assert_eq!(overall_risk(Low, Low), Low);
    }

    #[test]
    fn test_missing_questionnaire_counts_as_low() {
        let phq = phq9_severity(11);
        assert_eq!(overall_risk_of(Some(&phq), None), RiskLevel::Moderate);
        assert_eq!(overall_risk_of(None, None), RiskLevel::Low);
    }

    #[test]
    fn test_score_answers_validates() {
        assert_eq!(
            score_answers("PHQ-9", &PHQ9_QUESTIONS, &[1, 2, 1, 2, 0, 1, 1, 0, 0]),
            Ok(8)
        );
        assert_eq!(
            score_answers("GAD-7", &GAD7_QUESTIONS, &[1, 1]),
            Err(AnswerError::WrongCount {
                name: "GAD-7",
                expected: 7,
                actual: 2
            })
        );
        assert_eq!(
            score_answers("GAD-7", &GAD7_QUESTIONS, &[0, 0, 4, 0, 0, 0, 0]),
            Err(AnswerError::OutOfRange {
                name: "GAD-7",
                index: 3,
                value: 4
            })
        );
    }

    #[test]
    fn test_response_items_pair_questions() {
        let items = response_items("gad7", &GAD7_QUESTIONS, &[3, 2, 1, 0, 0, 1, 2]);
        assert_eq!(items.len(), 7);
        assert_eq!(items[0].question_id, "gad7_q1");
        assert_eq!(items[0].answer, 3);
        assert_eq!(items[6].question, GAD7_QUESTIONS[6]);
    }
}
