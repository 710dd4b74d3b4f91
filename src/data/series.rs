//! Time-keyed series used as walk-forward datasets.
//!
//! A [`TimeSeries`] is an ordered sequence of observations whose keys are
//! strictly increasing. Walk-forward fitting only ever sees a borrowed
//! prefix of it via [`SeriesView`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeriesError {
    #[error("Length mismatch: {keys} keys but {values} values")]
    LengthMismatch { keys: usize, values: usize },

    #[error("Keys must be strictly increasing (violated at position {0})")]
    NotIncreasing(usize),
}

/// Ordered observations with a strictly increasing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
}

impl<K: Ord, V> TimeSeries<K, V> {
    /// Build a series from parallel key/value vectors.
    pub fn new(keys: Vec<K>, values: Vec<V>) -> Result<Self, SeriesError> {
        if keys.len() != values.len() {
            return Err(SeriesError::LengthMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }

        if let Some(pos) = keys.windows(2).position(|w| w[0] >= w[1]) {
            return Err(SeriesError::NotIncreasing(pos + 1));
        }

        Ok(Self { keys, values })
    }

    /// Build a series from `(key, value)` pairs already in time order.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, SeriesError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let (keys, values): (Vec<K>, Vec<V>) = pairs.into_iter().unzip();
        Self::new(keys, values)
    }
}

impl<K, V> TimeSeries<K, V> {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key_at(&self, position: usize) -> Option<&K> {
        self.keys.get(position)
    }

    pub fn value_at(&self, position: usize) -> Option<&V> {
        self.values.get(position)
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    /// Observations at positions `[0, n)`. `n` is clamped to the length.
    pub fn prefix(&self, n: usize) -> SeriesView<'_, K, V> {
        let n = n.min(self.len());
        SeriesView {
            keys: &self.keys[..n],
            values: &self.values[..n],
        }
    }

    /// View over the whole series.
    pub fn view(&self) -> SeriesView<'_, K, V> {
        self.prefix(self.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.keys.iter().zip(self.values.iter())
    }
}

impl<K: Ord, V> TimeSeries<K, V> {
    /// Value stored under `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.keys
            .binary_search(key)
            .ok()
            .and_then(|pos| self.values.get(pos))
    }
}

/// Borrowed, contiguous slice of a [`TimeSeries`].
#[derive(Debug)]
pub struct SeriesView<'a, K, V> {
    keys: &'a [K],
    values: &'a [V],
}

impl<K, V> Clone for SeriesView<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for SeriesView<'_, K, V> {}

impl<'a, K, V> SeriesView<'a, K, V> {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &'a [K] {
        self.keys
    }

    pub fn values(&self) -> &'a [V] {
        self.values
    }

    pub fn first_key(&self) -> Option<&'a K> {
        self.keys.first()
    }

    pub fn last_key(&self) -> Option<&'a K> {
        self.keys.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a K, &'a V)> {
        self.keys.iter().zip(self.values.iter())
    }
}
