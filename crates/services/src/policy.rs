use prep_core::model::{FeedbackTiming, Product, SessionMode};
use storage::{QuestionQuery, SetFilter};

use crate::config::EngineConfig;

/// Practice test sets offered for every product.
pub const PRACTICE_SETS: [&str; 5] = [
    "practice_1",
    "practice_2",
    "practice_3",
    "practice_4",
    "practice_5",
];

/// What the learner picked before a session is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeSelection {
    Diagnostic,
    Drill {
        topic: String,
        sub_skill: String,
        feedback: FeedbackTiming,
    },
    Practice {
        set_id: String,
    },
}

impl ModeSelection {
    /// Drill on a sub-skill with immediate feedback.
    #[must_use]
    pub fn drill(topic: impl Into<String>, sub_skill: impl Into<String>) -> Self {
        Self::Drill {
            topic: topic.into(),
            sub_skill: sub_skill.into(),
            feedback: FeedbackTiming::Immediate,
        }
    }

    #[must_use]
    pub fn practice(set_id: impl Into<String>) -> Self {
        Self::Practice {
            set_id: set_id.into(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        match self {
            ModeSelection::Diagnostic => SessionMode::Diagnostic,
            ModeSelection::Drill { .. } => SessionMode::Drill,
            ModeSelection::Practice { .. } => SessionMode::Practice,
        }
    }
}

/// Topic and sub-skill a drill targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillTarget {
    pub topic: String,
    pub sub_skill: String,
}

/// Resolved, immutable description of how a session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModePolicy {
    pub mode: SessionMode,
    pub product: Product,
    pub query: QuestionQuery,
    pub feedback: FeedbackTiming,
    pub question_time_limit_secs: Option<u32>,
    pub session_time_limit_secs: Option<u32>,
    pub test_name: String,
    pub drill: Option<DrillTarget>,
}

impl ModePolicy {
    /// Resolve the policy for `selection` under `product`.
    #[must_use]
    pub fn resolve(product: Product, selection: &ModeSelection, config: &EngineConfig) -> Self {
        let test_type = product.test_type();
        let base = QuestionQuery::new(test_type);

        match selection {
            ModeSelection::Diagnostic => Self {
                mode: SessionMode::Diagnostic,
                product,
                query: base.with_set(SetFilter::Exact(config.diagnostic_set_id().to_owned())),
                feedback: FeedbackTiming::Immediate,
                question_time_limit_secs: None,
                session_time_limit_secs: None,
                test_name: format!("{test_type} Diagnostic Assessment"),
                drill: None,
            },
            ModeSelection::Drill {
                topic,
                sub_skill,
                feedback,
            } => Self {
                mode: SessionMode::Drill,
                product,
                query: base
                    .with_set(SetFilter::Prefix(config.drill_set_prefix().to_owned()))
                    .with_sub_skill(sub_skill.clone())
                    .with_limit(config.drill_question_cap()),
                feedback: *feedback,
                question_time_limit_secs: Some(config.question_time_limit_secs()),
                session_time_limit_secs: None,
                test_name: format!("{sub_skill} Drill"),
                drill: Some(DrillTarget {
                    topic: topic.clone(),
                    sub_skill: sub_skill.clone(),
                }),
            },
            ModeSelection::Practice { set_id } => Self {
                mode: SessionMode::Practice,
                product,
                query: base.with_set(SetFilter::Exact(set_id.clone())),
                feedback: FeedbackTiming::Immediate,
                question_time_limit_secs: None,
                session_time_limit_secs: Some(config.session_time_limit_secs()),
                test_name: format!("{test_type} {}", practice_label(set_id)),
                drill: None,
            },
        }
    }
}

/// Display label for a practice set id: `practice_1` becomes `PRACTICE 1`.
#[must_use]
pub fn practice_label(set_id: &str) -> String {
    set_id.replacen('_', " ", 1).to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_is_untimed_with_immediate_feedback() {
        let policy = ModePolicy::resolve(
            Product::EduTest,
            &ModeSelection::Diagnostic,
            &EngineConfig::default(),
        );
        assert_eq!(policy.mode, SessionMode::Diagnostic);
        assert_eq!(policy.query.test_type, "EduTest");
        assert_eq!(policy.query.set, SetFilter::Exact("diagnostic".into()));
        assert_eq!(policy.feedback, FeedbackTiming::Immediate);
        assert_eq!(policy.question_time_limit_secs, None);
        assert_eq!(policy.session_time_limit_secs, None);
        assert_eq!(policy.test_name, "EduTest Diagnostic Assessment");
    }

    #[test]
    fn drill_is_capped_filtered_and_question_timed() {
        let selection = ModeSelection::Drill {
            topic: "Mathematics".into(),
            sub_skill: "Fractions".into(),
            feedback: FeedbackTiming::Deferred,
        };
        let policy = ModePolicy::resolve(Product::Acer, &selection, &EngineConfig::default());

        assert_eq!(policy.query.test_type, "acer");
        assert_eq!(policy.query.set, SetFilter::Prefix("drill-".into()));
        assert_eq!(policy.query.sub_skill.as_deref(), Some("Fractions"));
        assert_eq!(policy.query.limit, Some(10));
        assert_eq!(policy.feedback, FeedbackTiming::Deferred);
        assert_eq!(policy.question_time_limit_secs, Some(60));
        assert_eq!(policy.session_time_limit_secs, None);
        assert_eq!(policy.test_name, "Fractions Drill");
        assert_eq!(policy.drill.unwrap().topic, "Mathematics");
    }

    #[test]
    fn practice_uses_session_timer_and_set_label() {
        let policy = ModePolicy::resolve(
            Product::EduTest,
            &ModeSelection::practice("practice_3"),
            &EngineConfig::default(),
        );
        assert_eq!(policy.query.set, SetFilter::Exact("practice_3".into()));
        assert_eq!(policy.session_time_limit_secs, Some(3_600));
        assert_eq!(policy.question_time_limit_secs, None);
        assert_eq!(policy.test_name, "EduTest PRACTICE 3");
    }

    #[test]
    fn selection_reports_mode() {
        assert_eq!(ModeSelection::drill("a", "b").mode(), SessionMode::Drill);
        assert_eq!(ModeSelection::practice(PRACTICE_SETS[0]).mode(), SessionMode::Practice);
    }
}
