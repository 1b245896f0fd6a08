use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use std::str::FromStr;

/// digits kept on intermediate amounts; billing happens in cents
const WORKING_DP: u32 = 8;
const BILLING_DP: u32 = 2;

fn working(d: Decimal) -> Decimal {
    d.round_dp(WORKING_DP)
}

/// Money type with 8 decimal places of working precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);
    /// one cent, the smallest billable amount
    pub const CENT: Money = Money(Decimal::from_parts(1, 0, 0, false, BILLING_DP));

    pub fn from_decimal(d: Decimal) -> Self {
        Money(working(d))
    }

    /// parse an exact decimal literal such as "211.54"
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Decimal::from_str(s).map(Money::from_decimal)
    }

    /// whole currency units
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// `amount` minor units at `scale` digits, e.g. (2554, 2) is 25.54
    pub fn from_minor(amount: i64, scale: u32) -> Self {
        Money::from_decimal(Decimal::new(amount, scale))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// amount as billed, rounded to cents (banker's rounding)
    pub fn to_cents(&self) -> Self {
        Money(self.0.round_dp(BILLING_DP))
    }

    /// `count` whole quotas of this amount
    pub fn times(self, count: u32) -> Self {
        self * Decimal::from(count)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// true when nothing is owed once rounded to cents
    pub fn is_settled(&self) -> bool {
        self.to_cents().0 <= Decimal::ZERO
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// subtract, flooring the result at zero
    pub fn saturating_sub(self, other: Self) -> Self {
        (self - other).max(Money::ZERO)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

macro_rules! money_ops {
    ($($op:ident $method:ident $assign:ident $assign_method:ident => $sym:tt),*) => {$(
        impl $op for Money {
            type Output = Money;

            fn $method(self, rhs: Money) -> Money {
                Money(working(self.0 $sym rhs.0))
            }
        }

        impl $assign for Money {
            fn $assign_method(&mut self, rhs: Money) {
                *self = *self $sym rhs;
            }
        }
    )*};
}

money_ops!(Add add AddAssign add_assign => +, Sub sub SubAssign sub_assign => -);

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, factor: Decimal) -> Money {
        Money(working(self.0 * factor))
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, divisor: Decimal) -> Money {
        Money(working(self.0 / divisor))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

/// rate type for percentages, stored as a fraction (0.10 == 10%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// whole percentage, 10 is 10%
    pub fn from_percentage(p: u32) -> Self {
        Rate::from_percentage_decimal(Decimal::from(p))
    }

    /// fractional percentage, 2.5 is 2.5%
    pub fn from_percentage_decimal(p: Decimal) -> Self {
        Rate(p / Decimal::ONE_HUNDRED)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn as_percentage(&self) -> Decimal {
        (self.0 * Decimal::ONE_HUNDRED).normalize()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_working_precision() {
        let m = Money::from_str_exact("100.123456789").unwrap();
        assert_eq!(m.to_string(), "100.12345679");
    }

    #[test]
    fn test_cent_rounding() {
        let quota = Money::from_major(49_500) / Decimal::from(234);
        assert_eq!(quota.to_cents(), Money::from_str_exact("211.54").unwrap());
        assert_eq!(Money::from_minor(1, 2), Money::CENT);
        assert_eq!(Money::from_minor(2554, 2), Money::from_str_exact("25.54").unwrap());
    }

    #[test]
    fn test_times_counts_whole_quotas() {
        let quota = Money::from_str_exact("211.54").unwrap();
        assert_eq!(quota.times(3), Money::from_str_exact("634.62").unwrap());
        assert_eq!(quota.times(0), Money::ZERO);
    }

    #[test]
    fn test_assign_ops_and_sum() {
        let mut m = Money::from_major(10);
        m += Money::CENT;
        m -= Money::from_major(4);
        assert_eq!(m, Money::from_str_exact("6.01").unwrap());

        let total: Money = [Money::ONE, Money::CENT, Money::from_major(2)].into_iter().sum();
        assert_eq!(total, Money::from_str_exact("3.01").unwrap());
    }

    #[test]
    fn test_settled_ignores_sub_cent_dust() {
        assert!(Money::from_str_exact("0.00000001").unwrap().is_settled());
        assert!(Money::ZERO.is_settled());
        assert!(Money::from_major(-3).is_settled());
        assert!(!Money::from_str_exact("0.01").unwrap().is_settled());
    }

    #[test]
    fn test_saturating_sub() {
        let a = Money::from_major(100);
        assert_eq!(a.saturating_sub(Money::from_major(150)), Money::ZERO);
        assert_eq!(a.saturating_sub(Money::from_major(40)), Money::from_major(60));
    }

    #[test]
    fn test_rate_percentages() {
        let rate = Rate::from_percentage(10);
        assert_eq!(rate.as_decimal(), dec!(0.1));
        assert_eq!(Rate::from_percentage_decimal(dec!(2.5)).as_decimal(), dec!(0.025));
        assert_eq!(rate.as_percentage(), dec!(10));
        assert_eq!(rate.to_string(), "10%");
    }
}
