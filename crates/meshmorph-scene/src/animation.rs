use meshmorph_math::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// FBX time unit, ticks per second.
pub const TICKS_PER_SECOND: i64 = 46_186_158_000;

pub fn ticks_to_seconds(ticks: i64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64
}

/// Time at which a pose is evaluated.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PoseTime {
    /// Animation curves sampled at t = 0.
    Zero,
    /// Static property values, animation ignored.
    Infinite,
}

impl Default for PoseTime {
    fn default() -> Self {
        PoseTime::Infinite
    }
}

impl PoseTime {
    pub fn from_use_t0(use_t0: bool) -> Self {
        if use_t0 {
            PoseTime::Zero
        } else {
            PoseTime::Infinite
        }
    }

    pub fn seconds(self) -> Option<f64> {
        match self {
            PoseTime::Zero => Some(0.0),
            PoseTime::Infinite => None,
        }
    }
}

/// Linearly interpolated key frames, times in seconds.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationCurve {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

impl AnimationCurve {
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> Self {
        let len = times.len().min(values.len());
        let mut keys: Vec<(f64, f64)> = times
            .into_iter()
            .zip(values.into_iter())
            .take(len)
            .collect();
        keys.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        Self {
            times: keys.iter().map(|k| k.0).collect(),
            values: keys.iter().map(|k| k.1).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((*self.times.first()?, *self.times.last()?))
    }

    /// Value at `time`, clamped to the first and last key.
    pub fn evaluate(&self, time: f64) -> Option<f64> {
        let last = self.times.len().checked_sub(1)?;
        if time <= self.times[0] {
            return Some(self.values[0]);
        }
        if time >= self.times[last] {
            return Some(self.values[last]);
        }

        let upper = self.times.partition_point(|t| *t <= time);
        let lower = upper - 1;
        let span = self.times[upper] - self.times[lower];
        if span <= 0.0 {
            return Some(self.values[upper]);
        }

        let f = (time - self.times[lower]) / span;
        Some(self.values[lower] + (self.values[upper] - self.values[lower]) * f)
    }
}

/// Curves of a three component property, missing components keep their static value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelCurves {
    pub curves: [Option<AnimationCurve>; 3],
}

impl ChannelCurves {
    pub fn is_empty(&self) -> bool {
        self.curves.iter().all(|c| c.as_ref().map_or(true, |c| c.is_empty()))
    }

    pub fn evaluate(&self, fallback: DVec3, time: f64) -> DVec3 {
        let mut value = fallback.to_array();
        for (v, curve) in value.iter_mut().zip(self.curves.iter()) {
            if let Some(sample) = curve.as_ref().and_then(|c| c.evaluate(time)) {
                *v = sample;
            }
        }
        DVec3::from(value)
    }

    pub fn time_range(&self) -> Option<(f64, f64)> {
        self.curves
            .iter()
            .filter_map(|c| c.as_ref().and_then(|c| c.time_range()))
            .fold(None, |acc, (start, end)| match acc {
                None => Some((start, end)),
                Some((s, e)) => Some((start.min(s), end.max(e))),
            })
    }
}

/// Animated local channels of a node.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeAnimation {
    pub translation: ChannelCurves,
    pub rotation: ChannelCurves,
    pub scaling: ChannelCurves,
}

impl NodeAnimation {
    pub fn is_empty(&self) -> bool {
        self.translation.is_empty() && self.rotation.is_empty() && self.scaling.is_empty()
    }

    pub fn time_range(&self) -> Option<(f64, f64)> {
        [&self.translation, &self.rotation, &self.scaling]
            .iter()
            .filter_map(|c| c.time_range())
            .fold(None, |acc, (start, end)| match acc {
                None => Some((start, end)),
                Some((s, e)) => Some((start.min(s), end.max(e))),
            })
    }
}
