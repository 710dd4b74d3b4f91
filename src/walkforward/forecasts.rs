//! Out-of-sample forecast storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Forecast state of a single observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ForecastSlot<F> {
    /// Inside the warmup, or no split covered this key.
    NotForecasted,
    /// Payload produced by the model for this key.
    Forecasted(F),
}

impl<F> Default for ForecastSlot<F> {
    fn default() -> Self {
        Self::NotForecasted
    }
}

impl<F> ForecastSlot<F> {
    pub fn is_forecasted(&self) -> bool {
        matches!(self, Self::Forecasted(_))
    }

    pub fn as_forecast(&self) -> Option<&F> {
        match self {
            Self::Forecasted(f) => Some(f),
            Self::NotForecasted => None,
        }
    }

    pub fn into_forecast(self) -> Option<F> {
        match self {
            Self::Forecasted(f) => Some(f),
            Self::NotForecasted => None,
        }
    }
}

/// Mapping from every key of a dataset to its forecast slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecastMap<K: Ord, F> {
    slots: BTreeMap<K, ForecastSlot<F>>,
}

impl<K: Ord, F> ForecastMap<K, F> {
    /// Pre-populate a slot for every key, all `NotForecasted`.
    pub fn from_keys<I: IntoIterator<Item = K>>(keys: I) -> Self {
        Self {
            slots: keys
                .into_iter()
                .map(|k| (k, ForecastSlot::NotForecasted))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&ForecastSlot<F>> {
        self.slots.get(key)
    }

    /// Forecast payload for `key`, if one was produced.
    pub fn forecast(&self, key: &K) -> Option<&F> {
        self.slots.get(key).and_then(ForecastSlot::as_forecast)
    }

    /// Store a forecast. Returns `false` if `key` is not part of the dataset.
    pub(crate) fn record(&mut self, key: &K, forecast: F) -> bool {
        match self.slots.get_mut(key) {
            Some(slot) => {
                *slot = ForecastSlot::Forecasted(forecast);
                true
            }
            None => false,
        }
    }

    /// All slots in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &ForecastSlot<F>)> {
        self.slots.iter()
    }

    /// Only the forecasted entries, in key order.
    pub fn forecasted(&self) -> impl Iterator<Item = (&K, &F)> {
        self.slots
            .iter()
            .filter_map(|(k, slot)| slot.as_forecast().map(|f| (k, f)))
    }

    pub fn forecasted_count(&self) -> usize {
        self.slots.values().filter(|s| s.is_forecasted()).count()
    }

    /// Transform every payload, keeping the slot layout.
    pub fn map<G>(&self, mut f: impl FnMut(&F) -> G) -> ForecastMap<K, G>
    where
        K: Clone,
    {
        ForecastMap {
            slots: self
                .slots
                .iter()
                .map(|(k, slot)| {
                    let mapped = match slot {
                        ForecastSlot::Forecasted(v) => ForecastSlot::Forecasted(f(v)),
                        ForecastSlot::NotForecasted => ForecastSlot::NotForecasted,
                    };
                    (k.clone(), mapped)
                })
                .collect(),
        }
    }

    /// First key that carries a forecast.
    pub fn first_forecasted_key(&self) -> Option<&K> {
        self.forecasted().next().map(|(k, _)| k)
    }
}
