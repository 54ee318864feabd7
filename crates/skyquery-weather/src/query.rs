//! Canonical query strings.
//!
//! The query text doubles as the cache key, so building it must be fully
//! deterministic: same scope, WOEID and units always give the same string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subset of the forecast record a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    All,
    Wind,
    Atmosphere,
    Astronomy,
    Forecast,
    Conditions,
}

impl Scope {
    /// Field selector used in the query text
    pub fn selector(&self) -> &'static str {
        match self {
            Self::All => "*",
            Self::Wind => "wind",
            Self::Atmosphere => "atmosphere",
            Self::Astronomy => "astronomy",
            Self::Forecast => "item.forecast",
            Self::Conditions => "item.condition",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.selector())
    }
}

/// Measurement units flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Units {
    #[default]
    #[serde(rename = "c")]
    Metric,
    #[serde(rename = "f")]
    Imperial,
}

impl Units {
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Metric => "c",
            Self::Imperial => "f",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" => Ok(Self::Metric),
            "f" => Ok(Self::Imperial),
            other => Err(format!("unknown units flag {:?}, expected \"c\" or \"f\"", other)),
        }
    }
}

/// Query for one scope of the forecast at `woeid`.
///
/// Imperial is the service default, so only metric adds a unit clause.
pub fn scoped_query(scope: Scope, woeid: u64, units: Units) -> String {
    let mut query = format!(
        "select {} from weather.forecast where woeid = {}",
        scope.selector(),
        woeid
    );
    if units == Units::Metric {
        query.push_str(" and u='c'");
    }
    query
}

/// Query resolving free text to candidate WOEIDs.
pub fn location_search_query(text: &str) -> String {
    format!(
        "select woeid, country.content, admin1.content, locality1.content from geo.places where text=\"{}\"",
        escape_literal(text)
    )
}

/// Escape a value for use inside a double-quoted literal.
fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
