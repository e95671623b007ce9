//! Container for precomputed indicator series.

use std::collections::BTreeMap;

/// Named indicator series, computed once per run before the bar loop.
///
/// Lookups return `None` for missing keys, out-of-range indices and NaN
/// values alike, so callers have a single "undefined" case to handle.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: BTreeMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    /// Raw value at `bar_index`, NaN included.
    pub fn get(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.series.get(name).and_then(|v| v.get(bar_index).copied())
    }

    /// Value at `bar_index` if it is defined (not NaN).
    pub fn defined(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.get(name, bar_index).filter(|v| !v.is_nan())
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defined_filters_nan() {
        let mut iv = IndicatorValues::new();
        iv.insert("sma_3", vec![f64::NAN, f64::NAN, 2.0]);
        assert!(iv.get("sma_3", 0).unwrap().is_nan());
        assert_eq!(iv.defined("sma_3", 0), None);
        assert_eq!(iv.defined("sma_3", 2), Some(2.0));
        assert_eq!(iv.defined("sma_3", 3), None);
        assert_eq!(iv.defined("missing", 0), None);
    }

    #[test]
    fn names_are_sorted() {
        let mut iv = IndicatorValues::new();
        iv.insert("sma_5", vec![]);
        iv.insert("atr_14", vec![]);
        let names: Vec<&str> = iv.names().collect();
        assert_eq!(names, vec!["atr_14", "sma_5"]);
        assert_eq!(iv.len(), 2);
    }
}
