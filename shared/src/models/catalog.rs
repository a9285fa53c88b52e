//! Reference data: providers, products, supplies

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation::{validate_positive, validate_whole_quantity};

/// What a provider supplies to the packhouse
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCategory {
    /// Grows and sells fruit
    FruitProducer,
    /// Sells packaging material and other supplies
    SupplyVendor,
    /// Provides services (transport, harvest crews, maintenance)
    ServiceProvider,
}

impl ProviderCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderCategory::FruitProducer => "fruit_producer",
            ProviderCategory::SupplyVendor => "supply_vendor",
            ProviderCategory::ServiceProvider => "service_provider",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "fruit_producer" => Some(ProviderCategory::FruitProducer),
            "supply_vendor" => Some(ProviderCategory::SupplyVendor),
            "service_provider" => Some(ProviderCategory::ServiceProvider),
            _ => None,
        }
    }
}

/// Unit a supply is counted in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SupplyUnit {
    Piece,
    Kilogram,
    Liter,
    Meter,
    Roll,
}

impl SupplyUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyUnit::Piece => "piece",
            SupplyUnit::Kilogram => "kilogram",
            SupplyUnit::Liter => "liter",
            SupplyUnit::Meter => "meter",
            SupplyUnit::Roll => "roll",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "piece" => Some(SupplyUnit::Piece),
            "kilogram" => Some(SupplyUnit::Kilogram),
            "liter" => Some(SupplyUnit::Liter),
            "meter" => Some(SupplyUnit::Meter),
            "roll" => Some(SupplyUnit::Roll),
            _ => None,
        }
    }

    /// Whether fractional quantities make sense for this unit
    pub fn allows_fractions(&self) -> bool {
        !matches!(self, SupplyUnit::Piece | SupplyUnit::Roll)
    }

    /// Quantities must be positive, and whole for units that do not split
    pub fn validate_quantity(&self, quantity: Decimal) -> Result<(), &'static str> {
        validate_positive(quantity)?;
        if !self.allows_fractions() {
            validate_whole_quantity(quantity)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_category_round_trip() {
        for c in [
            ProviderCategory::FruitProducer,
            ProviderCategory::SupplyVendor,
            ProviderCategory::ServiceProvider,
        ] {
            assert_eq!(ProviderCategory::from_str(c.as_str()), Some(c));
        }
    }

    #[test]
    fn test_supply_unit_fractions() {
        assert!(SupplyUnit::Kilogram.allows_fractions());
        assert!(!SupplyUnit::Piece.allows_fractions());
    }

    #[test]
    fn test_supply_unit_quantities() {
        let half = Decimal::new(25, 1);
        assert!(SupplyUnit::Kilogram.validate_quantity(half).is_ok());
        assert!(SupplyUnit::Roll.validate_quantity(half).is_err());
        assert!(SupplyUnit::Roll.validate_quantity(Decimal::from(3)).is_ok());
        assert!(SupplyUnit::Kilogram.validate_quantity(Decimal::ZERO).is_err());
    }
}
