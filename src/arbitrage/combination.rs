//! Outcome combinations evaluated for arbitrage.
//!
//! A combination picks one outcome in each of several markets of the same
//! event. Only semantically valid combinations are configured, never every
//! subset. The text form is `role:outcome` legs joined by `+`, for example
//! `team_one:yes+tie:yes+team_two:yes`.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::ConfigError;
use crate::market::{MarketRole, Outcome};

/// One leg of a combination: back `outcome` in the market playing `role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Leg {
    /// Market role inside the event.
    pub role: MarketRole,
    /// Outcome to back in that market.
    pub outcome: Outcome,
}

impl Leg {
    /// Create a leg.
    pub const fn new(role: MarketRole, outcome: Outcome) -> Self {
        Self { role, outcome }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.role, self.outcome)
    }
}

impl FromStr for Leg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (role, outcome) = s
            .split_once(':')
            .ok_or_else(|| format!("leg '{s}' is not role:outcome"))?;
        let role = MarketRole::from_str(role.trim())
            .map_err(|_| format!("unknown market role '{}'", role.trim()))?;
        let outcome = Outcome::from_str(outcome.trim())
            .map_err(|_| format!("unknown outcome '{}'", outcome.trim()))?;
        Ok(Self { role, outcome })
    }
}

/// A named set of legs whose outcomes cover the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    /// Short name such as "YES + YES + YES".
    pub name: String,
    /// Legs in evaluation order.
    pub legs: SmallVec<[Leg; 3]>,
}

impl Combination {
    /// Build a combination, rejecting empty leg lists and repeated markets.
    pub fn new(legs: impl IntoIterator<Item = Leg>) -> Result<Self, ConfigError> {
        let legs: SmallVec<[Leg; 3]> = legs.into_iter().collect();
        let definition = legs
            .iter()
            .map(|l| format!("{}:{}", l.role, l.outcome))
            .collect::<Vec<_>>()
            .join("+");

        if legs.is_empty() {
            return Err(ConfigError::InvalidCombination {
                definition,
                reason: "no legs".to_string(),
            });
        }

        let mut roles = HashSet::new();
        for leg in &legs {
            if !roles.insert(leg.role) {
                return Err(ConfigError::InvalidCombination {
                    definition,
                    reason: format!("market role {} used twice", leg.role),
                });
            }
        }

        Ok(Self {
            name: outcome_names(&legs),
            legs,
        })
    }

    /// Parse the `role:outcome+role:outcome` text form.
    pub fn parse(definition: &str) -> Result<Self, ConfigError> {
        let legs = definition
            .split('+')
            .filter(|part| !part.trim().is_empty())
            .map(Leg::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| ConfigError::InvalidCombination {
                definition: definition.to_string(),
                reason,
            })?;
        Self::new(legs)
    }

    /// Market roles this combination needs.
    pub fn roles(&self) -> impl Iterator<Item = MarketRole> + '_ {
        self.legs.iter().map(|l| l.role)
    }

    /// Number of legs.
    pub fn len(&self) -> usize {
        self.legs.len()
    }

    /// Whether there are no legs (never true for a constructed combination).
    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let legs = self
            .legs
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(" + ");
        write!(f, "{legs}")
    }
}

fn outcome_names(legs: &[Leg]) -> String {
    legs.iter()
        .map(|l| l.outcome.to_string())
        .collect::<Vec<_>>()
        .join(" + ")
}

/// Default 1X2 combinations.
///
/// - YES + YES + YES: team one wins, tie, team two wins.
/// - NO + YES + NO: team one does not win, tie, team two does not win.
pub fn one_x_two() -> Vec<Combination> {
    use MarketRole::{Tie, TeamOne, TeamTwo};
    use Outcome::{One, Two};

    [
        [Leg::new(TeamOne, One), Leg::new(Tie, One), Leg::new(TeamTwo, One)],
        [Leg::new(TeamOne, Two), Leg::new(Tie, One), Leg::new(TeamTwo, Two)],
    ]
    .into_iter()
    .map(|legs| Combination {
        name: outcome_names(&legs),
        legs: SmallVec::from_buf(legs),
    })
    .collect()
}

/// Parse a configured list of combinations.
///
/// The list must be non-empty and must not repeat a combination.
pub fn parse_combinations<S: AsRef<str>>(definitions: &[S]) -> Result<Vec<Combination>, ConfigError> {
    let combinations = definitions
        .iter()
        .map(|d| d.as_ref().trim())
        .filter(|d| !d.is_empty())
        .map(Combination::parse)
        .collect::<Result<Vec<_>, _>>()?;

    validate_combinations(&combinations)?;
    Ok(combinations)
}

/// Check a list of combinations is usable.
pub fn validate_combinations(combinations: &[Combination]) -> Result<(), ConfigError> {
    if combinations.is_empty() {
        return Err(ConfigError::NoCombinations);
    }

    let mut seen = HashSet::new();
    for combination in combinations {
        if combination.is_empty() {
            return Err(ConfigError::InvalidCombination {
                definition: combination.name.clone(),
                reason: "no legs".to_string(),
            });
        }
        if !seen.insert(combination.legs.as_slice()) {
            return Err(ConfigError::InvalidCombination {
                definition: combination.to_string(),
                reason: "configured twice".to_string(),
            });
        }
    }

    Ok(())
}
