//! Causal view of a run at one bar.

use crate::domain::Bar;
use crate::indicators::IndicatorValues;

/// What a strategy may see when evaluating bar `index`: bars `0..=index` and
/// indicator values at indices `<= index`. Nothing later is reachable.
#[derive(Debug, Clone, Copy)]
pub struct CausalContext<'a> {
    visible: &'a [Bar],
    indicators: &'a IndicatorValues,
}

impl<'a> CausalContext<'a> {
    /// # Panics
    /// If `index >= bars.len()`.
    pub fn new(bars: &'a [Bar], indicators: &'a IndicatorValues, index: usize) -> Self {
        Self {
            visible: &bars[..=index],
            indicators,
        }
    }

    pub fn index(&self) -> usize {
        self.visible.len() - 1
    }

    pub fn bar(&self) -> &'a Bar {
        &self.visible[self.visible.len() - 1]
    }

    /// The bar `back` sessions ago; `bar_back(0)` is the current bar.
    pub fn bar_back(&self, back: usize) -> Option<&'a Bar> {
        self.index()
            .checked_sub(back)
            .map(|i| &self.visible[i])
    }

    /// Defined indicator value at the current bar.
    pub fn value(&self, key: &str) -> Option<f64> {
        self.indicators.defined(key, self.index())
    }

    /// Defined indicator value `back` bars ago.
    pub fn value_back(&self, key: &str, back: usize) -> Option<f64> {
        let i = self.index().checked_sub(back)?;
        self.indicators.defined(key, i)
    }

    /// The same view one bar earlier.
    pub fn previous(&self) -> Option<CausalContext<'a>> {
        if self.visible.len() < 2 {
            return None;
        }
        Some(Self {
            visible: &self.visible[..self.visible.len() - 1],
            indicators: self.indicators,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn view_is_bounded_by_index() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0]);
        let mut iv = IndicatorValues::new();
        iv.insert("x", vec![10.0, 20.0, 30.0, 40.0]);
        let ctx = CausalContext::new(&bars, &iv, 2);
        assert_eq!(ctx.index(), 2);
        assert_eq!(ctx.bar().close, 3.0);
        assert_eq!(ctx.value("x"), Some(30.0));
        assert_eq!(ctx.value_back("x", 2), Some(10.0));
        assert_eq!(ctx.value_back("x", 3), None);
        assert!(ctx.bar_back(3).is_none());
        assert_eq!(ctx.bar_back(1).map(|b| b.close), Some(2.0));
    }

    #[test]
    fn previous_steps_back() {
        let bars = make_bars(&[1.0, 2.0]);
        let iv = IndicatorValues::new();
        let ctx = CausalContext::new(&bars, &iv, 1);
        let prev = ctx.previous().unwrap();
        assert_eq!(prev.index(), 0);
        assert!(prev.previous().is_none());
    }
}
