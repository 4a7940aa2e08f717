use crate::models::rule::Thresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy)]
pub struct TradingSignal {
    pub forecast: f64, // weighted sum of every rule that fired on the day
}

impl TradingSignal {
    // Above the buy threshold we want to be invested, at or below the sell threshold we want cash.
    // Equal thresholds leave no hold band.
    pub fn action(&self, thresholds: &Thresholds) -> Action {
        if self.forecast > thresholds.buy {
            Action::Buy
        } else if self.forecast <= thresholds.sell {
            Action::Sell
        } else {
            Action::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_thresholds_split_every_day() {
        let thresholds = Thresholds { buy: -2.5, sell: -2.5 };
        assert_eq!(TradingSignal { forecast: 0.0 }.action(&thresholds), Action::Buy);
        assert_eq!(TradingSignal { forecast: -2.5 }.action(&thresholds), Action::Sell);
        assert_eq!(TradingSignal { forecast: -3.0 }.action(&thresholds), Action::Sell);
    }

    #[test]
    fn hold_band_between_thresholds() {
        let thresholds = Thresholds { buy: 1.0, sell: -1.0 };
        assert_eq!(TradingSignal { forecast: 0.5 }.action(&thresholds), Action::Hold);
        assert_eq!(TradingSignal { forecast: 1.5 }.action(&thresholds), Action::Buy);
    }
}
