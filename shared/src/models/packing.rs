//! Packing packages and pallets

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::status::StatusFlow;

/// Where a packing package stands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    /// Packed, not yet on a pallet
    Ready,
    Palletized,
}

impl PackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Ready => "ready",
            PackageStatus::Palletized => "palletized",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ready" => Some(PackageStatus::Ready),
            "palletized" => Some(PackageStatus::Palletized),
            _ => None,
        }
    }
}

/// Pallet lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PalletStatus {
    Open,
    Closed,
}

impl PalletStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(PalletStatus::Open),
            "closed" => Some(PalletStatus::Closed),
            _ => None,
        }
    }
}

impl StatusFlow for PalletStatus {
    const ENTITY: &'static str = "packing pallet";

    fn as_str(&self) -> &'static str {
        match self {
            PalletStatus::Open => "open",
            PalletStatus::Closed => "closed",
        }
    }

    fn can_transition_to(&self, next: Self) -> bool {
        matches!((self, next), (PalletStatus::Open, PalletStatus::Closed))
    }

    fn is_terminal(&self) -> bool {
        matches!(self, PalletStatus::Closed)
    }
}

/// Packed fruit weight of a package line
pub fn packaged_weight_kg(package_count: i32, weight_per_package_kg: Decimal) -> Result<Decimal, &'static str> {
    if package_count <= 0 {
        return Err("Package count must be positive");
    }
    if weight_per_package_kg <= Decimal::ZERO {
        return Err("Weight per package must be positive");
    }
    Ok(Decimal::from(package_count) * weight_per_package_kg)
}

/// Derived totals of a pallet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalletTotals {
    pub package_lines: i64,
    pub package_count: i64,
    pub net_weight_kg: Decimal,
}

impl PalletTotals {
    /// Sum `(package_count, weight_per_package_kg)` lines
    pub fn from_packages(packages: &[(i32, Decimal)]) -> Self {
        packages.iter().fold(Self::default(), |mut acc, (count, per)| {
            acc.package_lines += 1;
            acc.package_count += i64::from(*count);
            acc.net_weight_kg += Decimal::from(*count) * *per;
            acc
        })
    }

    pub fn can_close(&self) -> bool {
        self.package_lines > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_packaged_weight() {
        assert_eq!(packaged_weight_kg(120, dec("4.5")).unwrap(), dec("540.0"));
        assert!(packaged_weight_kg(0, dec("4.5")).is_err());
        assert!(packaged_weight_kg(3, Decimal::ZERO).is_err());
    }

    #[test]
    fn test_pallet_totals() {
        let totals = PalletTotals::from_packages(&[(100, dec("4.5")), (20, dec("10"))]);
        assert_eq!(totals.package_lines, 2);
        assert_eq!(totals.package_count, 120);
        assert_eq!(totals.net_weight_kg, dec("650.0"));
        assert!(totals.can_close());
        assert!(!PalletTotals::default().can_close());
    }

    #[test]
    fn test_pallet_closes_once() {
        assert!(PalletStatus::Open.transition(PalletStatus::Closed).is_ok());
        assert!(PalletStatus::Closed.transition(PalletStatus::Open).is_err());
    }
}
