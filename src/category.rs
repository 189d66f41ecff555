//! PGN -> Category classifier (spec §4.4).

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    Heartbeat,
    Engine,
    Fuel,
    Navigation,
    EnergyDistribution,
    Steering,
    Battery,
    Product,
    Unknown,
}

impl Category {
    /// Classify a PGN into exactly one category.
    pub fn of_pgn(pgn: u32) -> Category {
        match pgn {
            126993 => Category::Heartbeat,
            127488 | 127489 | 127497 => Category::Engine,
            127505 => Category::Fuel,
            127250 | 127257 | 127258 | 126992 | 129025 | 129026 | 129029 | 129283 | 129284
            | 129539 | 129540 => Category::Navigation,
            127500 | 127501 | 127751 => Category::EnergyDistribution,
            127245 => Category::Steering,
            127506 | 127508 => Category::Battery,
            59392 | 60928 | 65361 => Category::Product,
            _ => Category::Unknown,
        }
    }

    /// Master Core collection name this category's data is stored under.
    pub fn collection_name(self) -> &'static str {
        match self {
            Category::Heartbeat => "NodeHeartbeat",
            Category::Engine => "Engine",
            Category::Fuel => "Fuel",
            Category::Navigation => "Navigation",
            Category::EnergyDistribution => "EnergyDistribution",
            Category::Steering => "Steering",
            Category::Battery => "Battery",
            Category::Product => "Product",
            Category::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.collection_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECOGNIZED_PGNS: &[u32] = &[
        126993, 127245, 127250, 127257, 127258, 127488, 127489, 127497, 127500, 127501, 127505,
        127506, 127508, 127751, 126992, 129025, 129026, 129029, 129283, 129284, 129539, 129540,
        65361, 60928, 59392,
    ];

    #[test]
    fn every_recognized_pgn_maps_to_a_non_unknown_category() {
        for &pgn in RECOGNIZED_PGNS {
            assert_ne!(Category::of_pgn(pgn), Category::Unknown, "pgn {pgn}");
        }
    }

    #[test]
    fn unrecognized_pgn_is_unknown() {
        assert_eq!(Category::of_pgn(131071), Category::Unknown);
    }

    #[test]
    fn collection_names_match_spec_table() {
        assert_eq!(Category::Navigation.collection_name(), "Navigation");
        assert_eq!(Category::Heartbeat.collection_name(), "NodeHeartbeat");
        assert_eq!(Category::Unknown.collection_name(), "Unknown");
    }

    #[test]
    fn steering_is_rudder_only() {
        assert_eq!(Category::of_pgn(127245), Category::Steering);
    }
}
