//! Time-window matching of feature times against auxiliary tagger hits.
//!
//! The correlation routine is generic over the hit type and its accessors so
//! both tagger groups instantiate the same code; a [`TaggerGroup`] bundles
//! the group identity with its configured cut window.

use tac_monitor_common::{CounterId, Real, TaggerKind};

/// A symmetric coincidence window around a configured cut centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoincidenceWindow {
    pub centre: Real,
    pub width: Real,
}

impl CoincidenceWindow {
    pub fn contains(&self, time: Real) -> bool {
        (time - self.centre).abs() < self.width
    }
}

/// Capability descriptor for one auxiliary detector group, built once from
/// configuration.
#[derive(Debug, Clone, Copy)]
pub struct TaggerGroup {
    pub kind: TaggerKind,
    pub window: CoincidenceWindow,
}

/// Result of testing one auxiliary hit. The id and time are always reported
/// (they feed the unconditional histograms); `matched` additionally flags
/// hits inside the window (they feed the matched-only histograms).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coincidence {
    pub counter: CounterId,
    pub time: Real,
    pub matched: bool,
}

/// Tests every hit, preserving input order.
pub fn correlate<H, I, T, M>(hits: &[H], id_of: I, time_of: T, matches: M) -> Vec<Coincidence>
where
    I: Fn(&H) -> CounterId,
    T: Fn(&H) -> Real,
    M: Fn(Real) -> bool,
{
    hits.iter()
        .map(|hit| {
            let time = time_of(hit);
            Coincidence {
                counter: id_of(hit),
                time,
                matched: matches(time),
            }
        })
        .collect()
}

impl TaggerGroup {
    /// Correlates with the group's configured window as the match predicate.
    pub fn correlate<H, I, T>(&self, hits: &[H], id_of: I, time_of: T) -> Vec<Coincidence>
    where
        I: Fn(&H) -> CounterId,
        T: Fn(&H) -> Real,
    {
        correlate(hits, id_of, time_of, |time| self.window.contains(time))
    }
}
