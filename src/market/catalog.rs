//! Grouping active markets into events.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, info};

use super::types::{Event, Market, MarketRole};
use crate::arbitrage::Combination;

/// Rules deciding which markets take part and which role each one plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRules {
    market_types: BTreeSet<u32>,
    tie_labels: Vec<String>,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self::new([1], &["tie", "draw", "x"])
    }
}

impl ClassificationRules {
    /// Accept `market_types` and treat any of `tie_labels` as the tie outcome.
    pub fn new<S: AsRef<str>>(market_types: impl IntoIterator<Item = u32>, tie_labels: &[S]) -> Self {
        Self {
            market_types: market_types.into_iter().collect(),
            tie_labels: tie_labels
                .iter()
                .map(|l| l.as_ref().trim().to_lowercase())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    /// Whether the market's type is eligible.
    pub fn accepts(&self, market: &Market) -> bool {
        self.market_types.contains(&market.market_type)
    }

    /// Role of a market, from its outcome-one label.
    ///
    /// A label containing a team name belongs to that team; otherwise a label
    /// equal to a tie label, or containing one as a whole word, is the tie.
    pub fn classify(&self, market: &Market) -> Option<MarketRole> {
        let label = market.outcome_one_label.trim().to_lowercase();
        let mentions = |name: &str| {
            let name = name.trim().to_lowercase();
            !name.is_empty() && label.contains(&name)
        };

        if mentions(&market.team_one_name) {
            Some(MarketRole::TeamOne)
        } else if mentions(&market.team_two_name) {
            Some(MarketRole::TeamTwo)
        } else if self
            .tie_labels
            .iter()
            .any(|tie| label == *tie || label.split_whitespace().any(|word| word == tie.as_str()))
        {
            Some(MarketRole::Tie)
        } else {
            None
        }
    }
}

/// Roles needed by at least one combination.
pub fn required_roles(combinations: &[Combination]) -> BTreeSet<MarketRole> {
    combinations.iter().flat_map(|c| c.roles()).collect()
}

/// Events whose markets cover every required role.
#[derive(Debug, Clone, Default)]
pub struct MarketCatalog {
    events: BTreeMap<String, Event>,
    /// Market id to event id.
    index: HashMap<String, String>,
}

impl MarketCatalog {
    /// Classify and group markets, keeping only complete events.
    pub fn build(
        markets: impl IntoIterator<Item = Market>,
        rules: &ClassificationRules,
        required: &BTreeSet<MarketRole>,
    ) -> Self {
        let mut grouped: BTreeMap<String, Event> = BTreeMap::new();
        let mut seen = 0usize;

        for market in markets {
            seen += 1;
            if !rules.accepts(&market) {
                continue;
            }
            let Some(role) = rules.classify(&market) else {
                debug!(
                    market_id = %market.short_id(),
                    label = %market.outcome_one_label,
                    "Unclassified market"
                );
                continue;
            };

            let event = grouped
                .entry(market.event_id.clone())
                .or_insert_with(|| Event {
                    event_id: market.event_id.clone(),
                    team_one_name: market.team_one_name.clone(),
                    team_two_name: market.team_two_name.clone(),
                    league_label: market.league_label.clone(),
                    markets: BTreeMap::new(),
                });

            if event.markets.contains_key(&role) {
                debug!(
                    event_id = %market.event_id,
                    market_id = %market.short_id(),
                    %role,
                    "Duplicate role, keeping first market"
                );
                continue;
            }
            event.markets.insert(role, market);
        }

        let events: BTreeMap<String, Event> = grouped
            .into_iter()
            .filter(|(_, event)| event.has_roles(required))
            .collect();

        let index = events
            .values()
            .flat_map(|event| {
                event
                    .market_ids()
                    .map(|id| (id.to_string(), event.event_id.clone()))
            })
            .collect();

        info!(markets = seen, events = events.len(), "Built market catalog");

        Self { events, index }
    }

    /// Complete events in id order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    /// Event by id.
    pub fn event(&self, event_id: &str) -> Option<&Event> {
        self.events.get(event_id)
    }

    /// Event a market belongs to.
    pub fn event_for_market(&self, market_id: &str) -> Option<&Event> {
        self.index.get(market_id).and_then(|id| self.events.get(id))
    }

    /// Every market id of every complete event.
    pub fn market_ids(&self) -> Vec<String> {
        self.events
            .values()
            .flat_map(|e| e.market_ids().map(str::to_string))
            .collect()
    }

    /// Number of complete events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no event is complete.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::one_x_two;

    fn test_market(event_id: &str, id: &str, market_type: u32, label: &str) -> Market {
        Market {
            market_id: id.to_string(),
            event_id: event_id.to_string(),
            market_type,
            outcome_one_label: label.to_string(),
            outcome_two_label: format!("Not {label}"),
            team_one_name: "Arsenal".to_string(),
            team_two_name: "Chelsea".to_string(),
            league_label: Some("Premier League".to_string()),
            game_time: None,
        }
    }

    fn full_event(event_id: &str) -> Vec<Market> {
        vec![
            test_market(event_id, &format!("{event_id}-1"), 1, "Arsenal"),
            test_market(event_id, &format!("{event_id}-x"), 1, "Tie"),
            test_market(event_id, &format!("{event_id}-2"), 1, "Chelsea"),
        ]
    }

    #[test]
    fn classifies_by_outcome_label() {
        let rules = ClassificationRules::default();

        let role = |label| rules.classify(&test_market("e", "m", 1, label));
        assert_eq!(role("Arsenal"), Some(MarketRole::TeamOne));
        assert_eq!(role("arsenal to win"), Some(MarketRole::TeamOne));
        assert_eq!(role("Chelsea"), Some(MarketRole::TeamTwo));
        assert_eq!(role("Draw"), Some(MarketRole::Tie));
        assert_eq!(role("X"), Some(MarketRole::Tie));
        assert_eq!(role("Over 2.5"), None);
    }

    #[test]
    fn custom_tie_labels() {
        let rules = ClassificationRules::new([1], &["empate"]);
        assert_eq!(
            rules.classify(&test_market("e", "m", 1, "Empate")),
            Some(MarketRole::Tie)
        );
        assert_eq!(rules.classify(&test_market("e", "m", 1, "Draw")), None);
    }

    #[test]
    fn keeps_only_complete_events_of_allowed_types() {
        let mut markets = full_event("L1");
        // L2 lacks the tie market
        markets.push(test_market("L2", "L2-1", 1, "Arsenal"));
        markets.push(test_market("L2", "L2-2", 1, "Chelsea"));
        // totals market for L1 is ignored
        markets.push(test_market("L1", "L1-ou", 2, "Over 2.5"));

        let required = required_roles(&one_x_two());
        let catalog = MarketCatalog::build(markets, &ClassificationRules::default(), &required);

        assert_eq!(catalog.len(), 1);
        let event = catalog.event("L1").unwrap();
        assert_eq!(event.title(), "Arsenal vs Chelsea");
        assert_eq!(event.market(MarketRole::Tie).unwrap().market_id, "L1-x");
        assert_eq!(catalog.event_for_market("L1-2").unwrap().event_id, "L1");
        assert!(catalog.event_for_market("L2-1").is_none());
        assert_eq!(catalog.market_ids().len(), 3);
    }

    #[test]
    fn duplicate_role_keeps_first_market() {
        let mut markets = full_event("L1");
        markets.push(test_market("L1", "L1-x-bis", 1, "Draw"));

        let required = required_roles(&one_x_two());
        let catalog = MarketCatalog::build(markets, &ClassificationRules::default(), &required);

        let event = catalog.event("L1").unwrap();
        assert_eq!(event.market(MarketRole::Tie).unwrap().market_id, "L1-x");
    }

    #[test]
    fn two_leg_combinations_need_fewer_roles() {
        let combinations = vec![Combination::parse("team_one:yes+team_two:yes").unwrap()];
        let required = required_roles(&combinations);
        let markets = vec![
            test_market("L3", "L3-1", 1, "Arsenal"),
            test_market("L3", "L3-2", 1, "Chelsea"),
        ];

        let catalog = MarketCatalog::build(markets, &ClassificationRules::default(), &required);

        assert_eq!(catalog.len(), 1);
    }
}
