//! Common types used across the platform

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// GPS coordinates of an orchard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: Decimal,
    pub longitude: Decimal,
}

impl GpsCoordinates {
    pub fn new(latitude: Decimal, longitude: Decimal) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude >= Decimal::from(-90)
            && self.latitude <= Decimal::from(90)
            && self.longitude >= Decimal::from(-180)
            && self.longitude <= Decimal::from(180)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_bounds() {
        assert!(GpsCoordinates::new(Decimal::from(19), Decimal::from(-102)).is_valid());
        assert!(!GpsCoordinates::new(Decimal::from(91), Decimal::ZERO).is_valid());
        assert!(!GpsCoordinates::new(Decimal::ZERO, Decimal::from(-181)).is_valid());
    }
}
