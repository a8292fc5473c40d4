use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::error::PredictError;
use crate::predict::look_angles::{look_angles, LookAngles};
use crate::predict::observer::Observer;
use crate::predict::propagation::Propagator;

const COARSE_STEP_SECONDS: i64 = 60; // 1 minute for initial scan
const FINE_STEP_SECONDS: i64 = 1; // 1 second for refinement

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Rise,
    Culminate,
    Set,
}

impl EventKind {
    pub fn code(self) -> u8 {
        match self {
            EventKind::Rise => 0,
            EventKind::Culminate => 1,
            EventKind::Set => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(EventKind::Rise),
            1 => Some(EventKind::Culminate),
            2 => Some(EventKind::Set),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub time: DateTime<Utc>,
    pub kind: EventKind,
}

/// Something that can tell when a satellite crosses an elevation cutoff.
pub trait EventSource {
    /// Time-ordered rise/culminate/set crossings of `cutoff_deg` within `[start, end]`.
    fn find_events(
        &self,
        observer: &Observer,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cutoff_deg: f64,
    ) -> Result<Vec<RawEvent>, PredictError>;

    fn look_angles(
        &self,
        observer: &Observer,
        at: DateTime<Utc>,
    ) -> Result<LookAngles, PredictError>;
}

/// Event finder that scans the propagated elevation curve.
///
/// Every local elevation peak is located first and refined, then the cutoff
/// crossings on either side of the peaks that reach the cutoff are bisected.
/// A pass already in progress at `start` yields no Rise, and one still in
/// progress at `end` yields no Set.
pub struct Sgp4EventFinder<P> {
    propagator: P,
    coarse_step: Duration,
}

/// (instant, elevation in degrees)
type Sample = (DateTime<Utc>, f64);

impl<P: Propagator> Sgp4EventFinder<P> {
    pub fn new(propagator: P) -> Self {
        Self {
            propagator,
            coarse_step: Duration::seconds(COARSE_STEP_SECONDS),
        }
    }

    fn elevation(&self, observer: &Observer, at: DateTime<Utc>) -> Result<f64, PredictError> {
        Ok(EventSource::look_angles(self, observer, at)?.elevation_deg)
    }

    /// Elevation every coarse step from `start` to `end`, both included.
    fn elevation_curve(
        &self,
        observer: &Observer,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, PredictError> {
        let mut samples = Vec::new();
        let mut cursor = start;
        loop {
            samples.push((cursor, self.elevation(observer, cursor)?));
            if cursor >= end {
                break;
            }
            cursor = (cursor + self.coarse_step).min(end);
        }
        Ok(samples)
    }

    /// Binary search to find exact cutoff crossing time
    fn refine_crossing(
        &self,
        observer: &Observer,
        before: DateTime<Utc>,
        after: DateTime<Utc>,
        cutoff_deg: f64,
        rising: bool,
    ) -> Result<DateTime<Utc>, PredictError> {
        let mut low = before;
        let mut high = after;

        while (high - low).num_seconds() > FINE_STEP_SECONDS {
            let mid = low + (high - low) / 2;
            let above = self.elevation(observer, mid)? >= cutoff_deg;
            if above == rising {
                high = mid;
            } else {
                low = mid;
            }
        }

        Ok(high)
    }

    /// Ternary search for the elevation peak between `low` and `high`.
    fn refine_culmination(
        &self,
        observer: &Observer,
        low: DateTime<Utc>,
        high: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, PredictError> {
        let mut low = low;
        let mut high = high;

        while (high - low).num_seconds() > FINE_STEP_SECONDS {
            let third = (high - low) / 3;
            let m1 = low + third;
            let m2 = high - third;
            if self.elevation(observer, m1)? < self.elevation(observer, m2)? {
                low = m1;
            } else {
                high = m2;
            }
        }

        Ok(low + (high - low) / 2)
    }

    /// Rise, culmination and set around the sampled peak `samples[peak]`.
    fn push_pass(
        &self,
        events: &mut Vec<RawEvent>,
        observer: &Observer,
        samples: &[Sample],
        peak: usize,
        cutoff_deg: f64,
    ) -> Result<(), PredictError> {
        let last = samples.len() - 1;
        // A peak on the window edge means the real maximum lies outside it
        let interior = peak > 0 && peak < last;

        let (peak_time, peak_elevation) = if interior {
            let time = self.refine_culmination(observer, samples[peak - 1].0, samples[peak + 1].0)?;
            let elevation = self.elevation(observer, time)?;
            if elevation >= samples[peak].1 {
                (time, elevation)
            } else {
                samples[peak]
            }
        } else {
            samples[peak]
        };
        if peak_elevation < cutoff_deg {
            return Ok(());
        }

        // Lowest samples on either side of the peak
        let mut before = peak;
        while before > 0 && samples[before - 1].1 < samples[before].1 {
            before -= 1;
        }
        let mut after = peak;
        while after < last && samples[after + 1].1 <= samples[after].1 {
            after += 1;
        }

        if samples[before].1 < cutoff_deg {
            let rise = self.refine_crossing(observer, samples[before].0, peak_time, cutoff_deg, true)?;
            events.push(RawEvent {
                time: rise,
                kind: EventKind::Rise,
            });
        }
        if interior {
            events.push(RawEvent {
                time: peak_time,
                kind: EventKind::Culminate,
            });
        }
        if samples[after].1 < cutoff_deg {
            let set = self.refine_crossing(observer, peak_time, samples[after].0, cutoff_deg, false)?;
            events.push(RawEvent {
                time: set,
                kind: EventKind::Set,
            });
        }
        Ok(())
    }
}

fn is_local_peak(samples: &[Sample], index: usize) -> bool {
    let elevation = samples[index].1;
    let rising_into = index == 0 || samples[index - 1].1 < elevation;
    let falling_out = index + 1 == samples.len() || samples[index + 1].1 <= elevation;
    rising_into && falling_out
}

impl<P: Propagator> EventSource for Sgp4EventFinder<P> {
    fn find_events(
        &self,
        observer: &Observer,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cutoff_deg: f64,
    ) -> Result<Vec<RawEvent>, PredictError> {
        let mut events = Vec::new();
        if end <= start {
            return Ok(events);
        }

        let samples = self.elevation_curve(observer, start, end)?;
        for peak in 0..samples.len() {
            if is_local_peak(&samples, peak) {
                self.push_pass(&mut events, observer, &samples, peak, cutoff_deg)?;
            }
        }

        events.sort_by_key(|e| e.time);
        Ok(events)
    }

    fn look_angles(
        &self,
        observer: &Observer,
        at: DateTime<Utc>,
    ) -> Result<LookAngles, PredictError> {
        let state = self.propagator.propagate(at)?;
        Ok(look_angles(observer, &state))
    }
}
