//! Vehicle valuation adjustments.
//!
//! Adjustments are applied in a fixed order: fixed amount, then a percentage
//! of the base value, then the flat condition adjustment. The condition
//! percentage is derived for display and never feeds back into the value.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueVariant {
    Trade,
    Market,
    Retail,
}

impl ValueVariant {
    pub const ALL: [ValueVariant; 3] = [ValueVariant::Trade, ValueVariant::Market, ValueVariant::Retail];
}

/// Adjustments applied to a single base value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Adjustments {
    pub fixed: i64,
    pub percentage_of_base: f64,
    pub condition_value: i64,
}

impl Adjustments {
    pub fn condition(condition_value: i64) -> Self {
        Self {
            condition_value,
            ..Self::default()
        }
    }
}

/// Rounded half away from zero to whole minor units
pub fn percentage_amount(base_value: i64, percentage: f64) -> i64 {
    (base_value as f64 * percentage / 100.0).round() as i64
}

pub fn adjusted_value(base_value: i64, adjustments: &Adjustments) -> i64 {
    let after_fixed = base_value + adjustments.fixed;
    let after_percentage = after_fixed + percentage_amount(base_value, adjustments.percentage_of_base);
    after_percentage + adjustments.condition_value
}

/// `adjustment / base * 100` to two decimals, zero when there is no base value
pub fn condition_adjustment_percentage(adjustment_value: i64, base_value: i64) -> f64 {
    if base_value == 0 {
        return 0.0;
    }
    let pct = adjustment_value as f64 / base_value as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantValuation {
    pub variant: ValueVariant,
    pub base_value: i64,
    pub adjusted_value: i64,
    pub condition_percentage: f64,
}

/// Base values per variant with one shared condition adjustment
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VehicleValuation {
    pub trade: i64,
    pub market: i64,
    pub retail: i64,
    pub condition_value: i64,
    pub trade_extras: Adjustments,
    pub market_extras: Adjustments,
    pub retail_extras: Adjustments,
}

impl VehicleValuation {
    pub fn new(trade: i64, market: i64, retail: i64) -> Self {
        Self {
            trade,
            market,
            retail,
            ..Self::default()
        }
    }
    pub fn set_condition_value(mut self, value: i64) -> Self {
        self.condition_value = value;
        self
    }
    pub fn set_extras(mut self, variant: ValueVariant, fixed: i64, percentage_of_base: f64) -> Self {
        let extras = match variant {
            ValueVariant::Trade => &mut self.trade_extras,
            ValueVariant::Market => &mut self.market_extras,
            ValueVariant::Retail => &mut self.retail_extras,
        };
        extras.fixed = fixed;
        extras.percentage_of_base = percentage_of_base;
        self
    }

    pub fn base_value(&self, variant: ValueVariant) -> i64 {
        match variant {
            ValueVariant::Trade => self.trade,
            ValueVariant::Market => self.market,
            ValueVariant::Retail => self.retail,
        }
    }

    fn adjustments(&self, variant: ValueVariant) -> Adjustments {
        let extras = match variant {
            ValueVariant::Trade => self.trade_extras,
            ValueVariant::Market => self.market_extras,
            ValueVariant::Retail => self.retail_extras,
        };
        Adjustments {
            condition_value: self.condition_value,
            ..extras
        }
    }

    pub fn evaluate(&self, variant: ValueVariant) -> VariantValuation {
        let base_value = self.base_value(variant);
        VariantValuation {
            variant,
            base_value,
            adjusted_value: adjusted_value(base_value, &self.adjustments(variant)),
            condition_percentage: condition_adjustment_percentage(self.condition_value, base_value),
        }
    }

    pub fn evaluate_all(&self) -> Vec<VariantValuation> {
        ValueVariant::ALL.iter().map(|v| self.evaluate(*v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_adjustment_on_base() {
        let adjusted = adjusted_value(240_000, &Adjustments::condition(12_000));
        assert_eq!(adjusted, 252_000);
        assert_eq!(condition_adjustment_percentage(12_000, 240_000), 5.00);
    }

    #[test]
    fn zero_base_has_zero_percentage() {
        assert_eq!(condition_adjustment_percentage(12_000, 0), 0.0);
        assert_eq!(adjusted_value(0, &Adjustments::condition(12_000)), 12_000);
    }

    #[test]
    fn percentage_is_rounded_to_two_places() {
        assert_eq!(condition_adjustment_percentage(1_000, 30_000), 3.33);
        assert_eq!(condition_adjustment_percentage(-2_000, 30_000), -6.67);
    }

    #[test]
    fn adjustments_apply_in_declared_order() {
        // percentage is taken of the base, not of base + fixed
        let adjustments = Adjustments {
            fixed: 10_000,
            percentage_of_base: 10.0,
            condition_value: -5_000,
        };
        assert_eq!(adjusted_value(100_000, &adjustments), 115_000);
    }

    #[test]
    fn percentage_amount_rounds_half_away_from_zero() {
        assert_eq!(percentage_amount(5, 10.0), 1);
        assert_eq!(percentage_amount(-5, 10.0), -1);
    }

    #[test]
    fn variants_share_condition_adjustment() {
        let valuation = VehicleValuation::new(200_000, 240_000, 260_000)
            .set_condition_value(12_000)
            .set_extras(ValueVariant::Retail, 5_000, 0.0);

        let all = valuation.evaluate_all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].adjusted_value, 212_000);
        assert_eq!(all[0].condition_percentage, 6.0);
        assert_eq!(all[1].adjusted_value, 252_000);
        assert_eq!(all[1].condition_percentage, 5.0);
        assert_eq!(all[2].adjusted_value, 277_000);
        assert_eq!(all[2].condition_percentage, 4.62);
    }
}
