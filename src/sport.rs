//! `Sport` is modeled as a tagged enum even though only one variant is wired
//! end-to-end. Adding a second sport means adding a variant here and a
//! second `{sport}_path` mapping in the Primary client — every other
//! component (parsers, resolvers, reconciliation, repositories) is already
//! generic over `Sport`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "lowercase")]
pub enum Sport {
    Basketball,
}

impl Sport {
    /// The `{sport}` path segment used by the Primary client's scoreboard
    /// and summary endpoints, e.g. `basketball/nba`.
    pub fn primary_path(&self) -> &'static str {
        match self {
            Sport::Basketball => "basketball/nba",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Basketball => "basketball",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basketball" | "nba" => Ok(Sport::Basketball),
            other => Err(anyhow::anyhow!("unsupported sport: {other}")),
        }
    }
}
