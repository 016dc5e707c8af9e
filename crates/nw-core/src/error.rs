//! Rule parsing errors.

/// Error type for a single line of rule text that cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleSyntaxError {
    #[error("Rule is too short: {0:?}")]
    TooShort(String),
    #[error("Unknown modifier: {0}")]
    UnknownModifier(String),
    #[error("Modifier {name} has an invalid value: {value:?}")]
    InvalidModifierValue { name: String, value: String },
    #[error("Modifier {0} is only allowed on allowlist rules")]
    AllowlistOnly(String),
    #[error("Invalid regular expression {pattern:?}: {reason}")]
    InvalidRegex { pattern: String, reason: String },
    #[error("Invalid host rule: {0:?}")]
    InvalidHostRule(String),
    #[error("Invalid cosmetic rule: {0:?}")]
    InvalidCosmeticRule(String),
}

impl RuleSyntaxError {
    pub(crate) fn invalid_value(name: &str, value: &str) -> Self {
        Self::InvalidModifierValue {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}
