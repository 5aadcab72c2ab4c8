use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Device privilege classification.
///
/// Ordered `Public < Peripheral < Operator < GodMode`. Comparisons go through
/// [`TrustTier::rank`], never through the tier's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrustTier {
    GodMode,
    Operator,
    Peripheral,
    #[default]
    Public,
}

impl TrustTier {
    pub const ALL: [TrustTier; 4] = [
        TrustTier::Public,
        TrustTier::Peripheral,
        TrustTier::Operator,
        TrustTier::GodMode,
    ];

    /// Position in the total order; higher means more privileged.
    pub const fn rank(self) -> u8 {
        match self {
            TrustTier::Public => 0,
            TrustTier::Peripheral => 1,
            TrustTier::Operator => 2,
            TrustTier::GodMode => 3,
        }
    }

    /// Whether this tier is at least as privileged as `required`.
    pub fn satisfies(self, required: TrustTier) -> bool {
        self.rank() >= required.rank()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TrustTier::GodMode => "GOD_MODE",
            TrustTier::Operator => "OPERATOR",
            TrustTier::Peripheral => "PERIPHERAL",
            TrustTier::Public => "PUBLIC",
        }
    }
}

impl PartialOrd for TrustTier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TrustTier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for TrustTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrustTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "GOD_MODE" => Ok(TrustTier::GodMode),
            "OPERATOR" => Ok(TrustTier::Operator),
            "PERIPHERAL" => Ok(TrustTier::Peripheral),
            "PUBLIC" => Ok(TrustTier::Public),
            other => Err(format!("unknown trust tier '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_order() {
        assert!(TrustTier::Public < TrustTier::Peripheral);
        assert!(TrustTier::Peripheral < TrustTier::Operator);
        assert!(TrustTier::Operator < TrustTier::GodMode);

        let mut tiers = vec![
            TrustTier::GodMode,
            TrustTier::Public,
            TrustTier::Operator,
            TrustTier::Peripheral,
        ];
        tiers.sort();
        assert_eq!(tiers, TrustTier::ALL.to_vec());
    }

    #[test]
    fn test_satisfies() {
        assert!(TrustTier::GodMode.satisfies(TrustTier::Operator));
        assert!(TrustTier::Operator.satisfies(TrustTier::Operator));
        assert!(!TrustTier::Peripheral.satisfies(TrustTier::Operator));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&TrustTier::GodMode).unwrap();
        assert_eq!(json, "\"GOD_MODE\"");
        let tier: TrustTier = serde_json::from_str("\"PERIPHERAL\"").unwrap();
        assert_eq!(tier, TrustTier::Peripheral);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("god-mode".parse::<TrustTier>(), Ok(TrustTier::GodMode));
        assert_eq!("operator".parse::<TrustTier>(), Ok(TrustTier::Operator));
        assert!("root".parse::<TrustTier>().is_err());
    }
}
