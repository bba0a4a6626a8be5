//! Market-related types for SX.bet binary markets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

/// One side of a binary market.
///
/// For the markets of a 1X2 event, outcome one is the named result
/// ("YES") and outcome two is its negation ("NO").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Outcome {
    /// Outcome one (YES).
    #[strum(to_string = "YES", serialize = "one", serialize = "1")]
    #[default]
    One,
    /// Outcome two (NO).
    #[strum(to_string = "NO", serialize = "two", serialize = "2")]
    Two,
}

impl Outcome {
    /// Outcome a taker receives when filling a maker order.
    pub fn taker_side(maker_is_betting_outcome_one: bool) -> Self {
        if maker_is_betting_outcome_one {
            Outcome::Two
        } else {
            Outcome::One
        }
    }
}

/// Role a binary market plays inside a multi-market event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum MarketRole {
    /// "Team one wins" vs not.
    #[strum(to_string = "team_one", serialize = "team1", serialize = "home")]
    TeamOne,
    /// "Tie" vs not.
    #[strum(to_string = "tie", serialize = "draw", serialize = "x")]
    Tie,
    /// "Team two wins" vs not.
    #[strum(to_string = "team_two", serialize = "team2", serialize = "away")]
    TeamTwo,
}

/// A binary market from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Market {
    /// Market hash.
    pub market_id: String,
    /// Event the market belongs to.
    pub event_id: String,
    /// Exchange market type (1 = 1X2 line).
    pub market_type: u32,
    /// Label of outcome one.
    pub outcome_one_label: String,
    /// Label of outcome two.
    pub outcome_two_label: String,
    /// Home team name.
    pub team_one_name: String,
    /// Away team name.
    pub team_two_name: String,
    /// League the fixture belongs to.
    pub league_label: Option<String>,
    /// Kick-off as a Unix timestamp.
    pub game_time: Option<i64>,
}

impl Market {
    /// Label of the given outcome.
    pub fn outcome_label(&self, outcome: Outcome) -> &str {
        match outcome {
            Outcome::One => &self.outcome_one_label,
            Outcome::Two => &self.outcome_two_label,
        }
    }

    /// Abbreviated market hash for log lines.
    pub fn short_id(&self) -> &str {
        let end = self
            .market_id
            .char_indices()
            .nth(10)
            .map(|(i, _)| i)
            .unwrap_or(self.market_id.len());
        &self.market_id[..end]
    }

    /// Kick-off time, when known and valid.
    pub fn kickoff(&self) -> Option<OffsetDateTime> {
        self.game_time
            .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok())
    }
}

/// A real-world fixture and its classified binary markets.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Event identifier.
    pub event_id: String,
    /// Home team name.
    pub team_one_name: String,
    /// Away team name.
    pub team_two_name: String,
    /// League label.
    pub league_label: Option<String>,
    /// Markets keyed by the role they play.
    pub markets: BTreeMap<MarketRole, Market>,
}

impl Event {
    /// Market playing the given role, if the event has one.
    pub fn market(&self, role: MarketRole) -> Option<&Market> {
        self.markets.get(&role)
    }

    /// Whether every one of `roles` is present.
    pub fn has_roles<'a>(&self, roles: impl IntoIterator<Item = &'a MarketRole>) -> bool {
        roles.into_iter().all(|role| self.markets.contains_key(role))
    }

    /// Market ids of the event in role order.
    pub fn market_ids(&self) -> impl Iterator<Item = &str> {
        self.markets.values().map(|m| m.market_id.as_str())
    }

    /// "Team One vs Team Two".
    pub fn title(&self) -> String {
        format!("{} vs {}", self.team_one_name, self.team_two_name)
    }
}

/// Parsed market data from the active markets endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketData {
    /// Market hash.
    pub market_hash: Option<String>,
    /// Event identifier.
    #[serde(rename = "sportXeventId")]
    pub sport_x_event_id: Option<String>,
    /// Market type.
    #[serde(rename = "type")]
    pub market_type: Option<u32>,
    /// Outcome one label.
    pub outcome_one_name: Option<String>,
    /// Outcome two label.
    pub outcome_two_name: Option<String>,
    /// Home team.
    pub team_one_name: Option<String>,
    /// Away team.
    pub team_two_name: Option<String>,
    /// League label.
    pub league_label: Option<String>,
    /// Kick-off timestamp.
    pub game_time: Option<i64>,
    /// Market status (ACTIVE, ...).
    pub status: Option<String>,
}

impl MarketData {
    /// Convert into a catalog market. Entries without an id or event are dropped.
    pub fn into_market(self) -> Option<Market> {
        Some(Market {
            market_id: self.market_hash?,
            event_id: self.sport_x_event_id?,
            market_type: self.market_type.unwrap_or_default(),
            outcome_one_label: self.outcome_one_name.unwrap_or_default(),
            outcome_two_label: self.outcome_two_name.unwrap_or_default(),
            team_one_name: self.team_one_name.unwrap_or_default(),
            team_two_name: self.team_two_name.unwrap_or_default(),
            league_label: self.league_label,
            game_time: self.game_time,
        })
    }
}

/// Active league from the leagues endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct League {
    /// League identifier.
    pub league_id: u64,
    /// Display label.
    pub label: String,
    /// Sport identifier.
    pub sport_id: Option<u32>,
    /// Event counts by event type.
    #[serde(default)]
    pub events_by_type: BTreeMap<String, u64>,
}
