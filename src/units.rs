//! This module defines various unit types and their conversions.
//!
//! Quantities read from input files are wrapped in these types so that, for example, a power
//! capacity cannot accidentally be added to an energy capacity. Coefficients handed to the
//! optimisation problem are plain `f64`s, obtained with `value()`.

use float_cmp::{ApproxEq, F64Margin};
use serde::{Deserialize, Serialize};

macro_rules! unit_struct {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// Create a new instance of the unit type from a f64 value
            pub fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ApproxEq for $name {
            type Margin = F64Margin;

            fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
                self.0.approx_eq(other.0, margin)
            }
        }
    };
}

macro_rules! impl_dimensionless_ops {
    ($name:ident) => {
        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Mul<$name> for Dimensionless {
            type Output = $name;
            fn mul(self, rhs: $name) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 / rhs.0)
            }
        }
    };
}

unit_struct!(Dimensionless, "A dimensionless quantity (fractions, factors, derates)");

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 / rhs.0)
    }
}

impl Dimensionless {
    /// Raise to an integer power
    pub fn powi(self, rhs: i32) -> Self {
        Dimensionless(self.0.powi(rhs))
    }
}

// Base quantities
unit_struct!(Power, "Electric power in MW");
unit_struct!(Energy, "Electric energy in MWh");
unit_struct!(Hours, "A duration in hours");
unit_struct!(Money, "An amount of money");

// Derived quantities
unit_struct!(MoneyPerEnergy, "Cost per MWh");
unit_struct!(MoneyPerPower, "Cost per MW");
unit_struct!(MoneyPerPowerYear, "Annualised cost per MW of capacity");
unit_struct!(MoneyPerEnergyYear, "Annualised cost per MWh of energy capacity");

impl_dimensionless_ops!(Power);
impl_dimensionless_ops!(Energy);
impl_dimensionless_ops!(Hours);
impl_dimensionless_ops!(Money);
impl_dimensionless_ops!(MoneyPerEnergy);
impl_dimensionless_ops!(MoneyPerPower);
impl_dimensionless_ops!(MoneyPerPowerYear);
impl_dimensionless_ops!(MoneyPerEnergyYear);

// Multiplication rules
impl_mul!(Power, Hours, Energy);
impl_mul!(MoneyPerEnergy, Energy, Money);
impl_mul!(MoneyPerPower, Power, Money);

// Division rules
impl_div!(Energy, Hours, Power);
impl_div!(Energy, Power, Hours);

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_power_times_hours() {
        let energy = Power(50.0) * Hours(2.0);
        assert_approx_eq!(Energy, energy, Energy(100.0));
        assert_approx_eq!(Energy, Hours(2.0) * Power(50.0), Energy(100.0));
    }

    #[test]
    fn test_energy_over_power() {
        assert_approx_eq!(Hours, Energy(400.0) / Power(100.0), Hours(4.0));
    }

    #[test]
    fn test_dimensionless_scaling() {
        let derated = Power(200.0) * Dimensionless(0.9);
        assert_approx_eq!(Power, derated, Power(180.0));
        assert_approx_eq!(Power, Dimensionless(0.5) * Power(10.0), Power(5.0));
    }
}
