//! Delivery fee lookup by address keyword

use shared::order::money::is_valid_amount;

pub trait DeliveryFeeLookup: Send + Sync + std::fmt::Debug {
    /// Fee for delivering to `address`; 0 when no zone matches
    fn fee_for(&self, address: &str) -> f64;
}

/// Keyword table parsed from `DELIVERY_ZONES` (`keyword=fee;keyword=fee`)
///
/// The first keyword contained in the address (case-insensitive) wins.
#[derive(Debug, Clone, Default)]
pub struct ZoneFeeTable {
    zones: Vec<(String, f64)>,
}

impl ZoneFeeTable {
    pub fn parse(table: &str) -> Result<Self, String> {
        let mut zones = Vec::new();
        for entry in table.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (keyword, fee) = entry
                .split_once('=')
                .ok_or_else(|| format!("invalid delivery zone entry '{entry}'"))?;
            let keyword = keyword.trim().to_lowercase();
            if keyword.is_empty() {
                return Err(format!("empty keyword in '{entry}'"));
            }
            let fee: f64 = fee
                .trim()
                .parse()
                .map_err(|_| format!("invalid fee in '{entry}'"))?;
            if !is_valid_amount(fee) {
                return Err(format!("invalid fee in '{entry}'"));
            }
            zones.push((keyword, fee));
        }
        Ok(Self { zones })
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl DeliveryFeeLookup for ZoneFeeTable {
    fn fee_for(&self, address: &str) -> f64 {
        let address = address.to_lowercase();
        self.zones
            .iter()
            .find(|(keyword, _)| address.contains(keyword.as_str()))
            .map(|(_, fee)| *fee)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_lookup() {
        let table = ZoneFeeTable::parse("Makati=50; quezon city = 80 ;").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.fee_for("123 Ayala Ave, MAKATI"), 50.0);
        assert_eq!(table.fee_for("Quezon City"), 80.0);
        assert_eq!(table.fee_for("Cebu"), 0.0);
    }

    #[test]
    fn test_parse_errors() {
        assert!(ZoneFeeTable::parse("makati").is_err());
        assert!(ZoneFeeTable::parse("makati=abc").is_err());
        assert!(ZoneFeeTable::parse("makati=-5").is_err());
        assert!(ZoneFeeTable::parse("=5").is_err());
        assert!(ZoneFeeTable::parse("").unwrap().is_empty());
    }
}
