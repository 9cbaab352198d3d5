use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_QUESTION_TIME_LIMIT: &str = "PREP_QUESTION_TIME_LIMIT_SECS";
pub const ENV_SESSION_TIME_LIMIT: &str = "PREP_SESSION_TIME_LIMIT_SECS";
pub const ENV_DRILL_CAP: &str = "PREP_DRILL_QUESTION_CAP";

/// Tunables shared by every mode policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    question_time_limit_secs: u32,
    session_time_limit_secs: u32,
    drill_question_cap: usize,
    drill_set_prefix: String,
    diagnostic_set_id: String,
}

impl Default for EngineConfig {
    /// 60 seconds per drill question, one hour per practice test, ten
    /// questions per drill.
    fn default() -> Self {
        Self {
            question_time_limit_secs: 60,
            session_time_limit_secs: 60 * 60,
            drill_question_cap: 10,
            drill_set_prefix: "drill-".into(),
            diagnostic_set_id: "diagnostic".into(),
        }
    }
}

impl EngineConfig {
    /// Creates a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a limit or cap is zero or a set identifier is blank.
    pub fn new(
        question_time_limit_secs: u32,
        session_time_limit_secs: u32,
        drill_question_cap: usize,
        drill_set_prefix: impl Into<String>,
        diagnostic_set_id: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        if question_time_limit_secs == 0 {
            return Err(ConfigError::InvalidQuestionTimeLimit);
        }
        if session_time_limit_secs == 0 {
            return Err(ConfigError::InvalidSessionTimeLimit);
        }
        if drill_question_cap == 0 {
            return Err(ConfigError::InvalidDrillCap);
        }
        let drill_set_prefix = drill_set_prefix.into();
        if drill_set_prefix.trim().is_empty() {
            return Err(ConfigError::BlankSetId("drill set prefix"));
        }
        let diagnostic_set_id = diagnostic_set_id.into();
        if diagnostic_set_id.trim().is_empty() {
            return Err(ConfigError::BlankSetId("diagnostic set id"));
        }

        Ok(Self {
            question_time_limit_secs,
            session_time_limit_secs,
            drill_question_cap,
            drill_set_prefix,
            diagnostic_set_id,
        })
    }

    /// Defaults overlaid with `PREP_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnv` for unparsable values and the
    /// validation errors of [`EngineConfig::new`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overlaid with values from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`EngineConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let question = parse_var(&lookup, ENV_QUESTION_TIME_LIMIT)?
            .unwrap_or(defaults.question_time_limit_secs);
        let session = parse_var(&lookup, ENV_SESSION_TIME_LIMIT)?
            .unwrap_or(defaults.session_time_limit_secs);
        let cap = parse_var(&lookup, ENV_DRILL_CAP)?.unwrap_or(defaults.drill_question_cap);

        Self::new(
            question,
            session,
            cap,
            defaults.drill_set_prefix,
            defaults.diagnostic_set_id,
        )
    }

    #[must_use]
    pub fn question_time_limit_secs(&self) -> u32 {
        self.question_time_limit_secs
    }

    #[must_use]
    pub fn session_time_limit_secs(&self) -> u32 {
        self.session_time_limit_secs
    }

    #[must_use]
    pub fn drill_question_cap(&self) -> usize {
        self.drill_question_cap
    }

    #[must_use]
    pub fn drill_set_prefix(&self) -> &str {
        &self.drill_set_prefix
    }

    #[must_use]
    pub fn diagnostic_set_id(&self) -> &str {
        &self.diagnostic_set_id
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_product_limits() {
        let config = EngineConfig::default();
        assert_eq!(config.question_time_limit_secs(), 60);
        assert_eq!(config.session_time_limit_secs(), 3_600);
        assert_eq!(config.drill_question_cap(), 10);
        assert_eq!(config.drill_set_prefix(), "drill-");
        assert_eq!(config.diagnostic_set_id(), "diagnostic");
    }

    #[test]
    fn new_rejects_zero_values() {
        assert_eq!(
            EngineConfig::new(0, 1, 1, "d-", "diag").unwrap_err(),
            ConfigError::InvalidQuestionTimeLimit
        );
        assert_eq!(
            EngineConfig::new(1, 0, 1, "d-", "diag").unwrap_err(),
            ConfigError::InvalidSessionTimeLimit
        );
        assert_eq!(
            EngineConfig::new(1, 1, 0, "d-", "diag").unwrap_err(),
            ConfigError::InvalidDrillCap
        );
        assert_eq!(
            EngineConfig::new(1, 1, 1, " ", "diag").unwrap_err(),
            ConfigError::BlankSetId("drill set prefix")
        );
    }

    #[test]
    fn lookup_overlays_defaults() {
        let vars: HashMap<&str, &str> =
            [(ENV_QUESTION_TIME_LIMIT, "45"), (ENV_DRILL_CAP, " 5 ")].into();
        let config =
            EngineConfig::from_lookup(|var| vars.get(var).map(|v| (*v).to_owned())).unwrap();

        assert_eq!(config.question_time_limit_secs(), 45);
        assert_eq!(config.session_time_limit_secs(), 3_600);
        assert_eq!(config.drill_question_cap(), 5);
    }

    #[test]
    fn lookup_reports_bad_values() {
        let err = EngineConfig::from_lookup(|var| {
            (var == ENV_SESSION_TIME_LIMIT).then(|| "soon".to_owned())
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                var: ENV_SESSION_TIME_LIMIT,
                raw: "soon".into()
            }
        );
    }
}
