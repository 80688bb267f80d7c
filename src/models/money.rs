use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits of the ledger's smallest currency unit.
pub const MONEY_SCALE: u32 = 2;

/// Fractional digits accepted for item quantities.
pub const QUANTITY_SCALE: u32 = 4;

/// Amounts are stored as NUMERIC(19, 2): magnitudes must stay below 10^17.
const MONEY_LIMIT: i64 = 100_000_000_000_000_000;

/// Quantities are stored as NUMERIC(19, 4): magnitudes must stay below 10^15.
const QUANTITY_LIMIT: i64 = 1_000_000_000_000_000;

/// Returns true if the amount is expressible in whole smallest currency units.
pub fn is_money(amount: &Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}

/// Returns true if the quantity fits the persisted quantity precision.
pub fn is_quantity(quantity: &Decimal) -> bool {
    quantity.normalize().scale() <= QUANTITY_SCALE
}

/// Returns true if the amount's magnitude fits a persisted money column.
pub fn fits_money(amount: &Decimal) -> bool {
    amount.abs() < Decimal::from(MONEY_LIMIT)
}

/// Returns true if the quantity's magnitude fits a persisted quantity column.
pub fn fits_quantity(quantity: &Decimal) -> bool {
    quantity.abs() < Decimal::from(QUANTITY_LIMIT)
}

/// Rounds an amount to the smallest currency unit, midpoint away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_is_money() {
        assert!(is_money(&dec!(100)));
        assert!(is_money(&dec!(100.10)));
        assert!(is_money(&dec!(100.100)));
        assert!(!is_money(&dec!(100.105)));
    }

    #[test]
    fn test_is_quantity() {
        assert!(is_quantity(&dec!(1.2345)));
        assert!(!is_quantity(&dec!(1.23456)));
    }

    #[test]
    fn test_money_and_quantity_ranges() {
        assert!(fits_money(&dec!(99999999999999999.99)));
        assert!(!fits_money(&dec!(100000000000000000)));
        assert!(!fits_money(&dec!(-100000000000000000)));
        assert!(!fits_money(&Decimal::MAX));

        assert!(fits_quantity(&dec!(999999999999999.9999)));
        assert!(!fits_quantity(&dec!(1000000000000000)));
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(dec!(10.005)), dec!(10.01));
        assert_eq!(round_money(dec!(10.004)), dec!(10.00));
        assert_eq!(round_money(dec!(-10.005)), dec!(-10.01));
    }
}
