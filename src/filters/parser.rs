use std::fmt;
use std::time::Duration;

/// Filter comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    Regex,
    NegativeRegex,
    LessThan,
    GreaterThan,
}

impl FilterOperator {
    /// Two-character operators come first so that `=~` is not read as `=`
    pub const ALL: [FilterOperator; 6] = [
        FilterOperator::Regex,
        FilterOperator::NegativeRegex,
        FilterOperator::NotEqual,
        FilterOperator::Equal,
        FilterOperator::LessThan,
        FilterOperator::GreaterThan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equal => "=",
            FilterOperator::NotEqual => "!=",
            FilterOperator::Regex => "=~",
            FilterOperator::NegativeRegex => "!~",
            FilterOperator::LessThan => "<",
            FilterOperator::GreaterThan => ">",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Characters that may only appear inside an operator
const OPERATOR_CHARS: [char; 5] = ['=', '!', '~', '<', '>'];

/// Tokenized filter expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// Anything that does not start with a key directly followed by an operator
    FreeText(String),
    /// `<key><operator><value>`
    Keyed {
        key: String,
        operator: FilterOperator,
        value: String,
    },
}

/// Split raw filter text into key, operator and value
pub fn parse_expression(raw: &str) -> Result<Expression, FilterError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(FilterError::EmptyExpression);
    }

    let key_len = key_prefix_len(text);
    let (key, rest) = text.split_at(key_len);
    if key_len == 0 || !rest.starts_with(OPERATOR_CHARS) {
        return Ok(Expression::FreeText(text.to_string()));
    }

    let operator = FilterOperator::ALL
        .into_iter()
        .find(|op| rest.starts_with(op.as_str()))
        .ok_or_else(|| FilterError::UnknownOperator(rest.to_string()))?;

    let value = &rest[operator.as_str().len()..];
    if value.is_empty() {
        return Err(FilterError::MissingValue(key.to_string()));
    }
    if value.starts_with(OPERATOR_CHARS) {
        return Err(FilterError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    Ok(Expression::Keyed {
        key: key.to_string(),
        operator,
        value: value.to_string(),
    })
}

/// Length of the leading `@?[A-Za-z0-9_]+` key, zero when there is none
fn key_prefix_len(text: &str) -> usize {
    let name = text.strip_prefix('@').unwrap_or(text);
    let name_len = name
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(name.len());
    if name_len == 0 {
        return 0;
    }
    text.len() - name.len() + name_len
}

/// Parse a duration literal such as `1h`, `90s`, `1h30m` or `-15m`.
///
/// The sign is accepted and ignored, only the magnitude is returned.
pub fn parse_duration(s: &str) -> Result<Duration, FilterError> {
    let invalid = || FilterError::InvalidDuration(s.to_string());

    let digits = s.trim_start_matches(['-', '+']);
    if digits.is_empty() || s.len() - digits.len() > 1 {
        return Err(invalid());
    }

    let mut total = 0.0_f64;
    let mut rest = digits;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let number: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_secs = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        total += number * unit_secs;
    }

    Duration::try_from_secs_f64(total).map_err(|_| invalid())
}

/// Why a filter expression could not be compiled
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("Empty filter expression")]
    EmptyExpression,

    #[error("Unknown operator in '{0}'")]
    UnknownOperator(String),

    #[error("Missing value for '{0}'")]
    MissingValue(String),

    #[error("Invalid value '{value}' for '{key}'")]
    InvalidValue { key: String, value: String },

    #[error("Unknown filter key '{0}'")]
    UnknownMetaKey(String),

    #[error("Operator '{operator}' is not supported for '{key}'")]
    OperatorNotAllowed {
        key: String,
        operator: FilterOperator,
    },

    #[error("Invalid regex: {0}")]
    InvalidRegex(String),

    #[error("Invalid alert state '{0}'")]
    InvalidState(String),

    #[error("Invalid duration '{0}'")]
    InvalidDuration(String),

    #[error("Invalid limit '{0}', expected a positive integer")]
    InvalidLimit(String),
}
