use crate::error::MonitorError;
use serde::Serialize;
use tac_monitor_common::Real;

/// Fixed linear binning over the half-open interval `[lo, hi)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Axis {
    bins: usize,
    lo: Real,
    hi: Real,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Slot {
    Underflow,
    Bin(usize),
    Overflow,
}

impl Axis {
    pub fn new(bins: usize, lo: Real, hi: Real) -> Self {
        Self {
            bins: bins.max(1),
            lo,
            hi,
        }
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub(crate) fn slot(&self, value: Real) -> Slot {
        // NaN fails both range comparisons and must not land in a regular bin.
        if value.is_nan() {
            Slot::Overflow
        } else if value < self.lo {
            Slot::Underflow
        } else if value >= self.hi {
            Slot::Overflow
        } else {
            let fraction = (value - self.lo) / (self.hi - self.lo);
            // Rounding at the top edge must not escape the bin range.
            Slot::Bin(((fraction * self.bins as Real) as usize).min(self.bins - 1))
        }
    }
}

/// A 1-D statistical accumulator. Out-of-range fills are routed to the
/// underflow/overflow counters instead of a regular bin; the binning never
/// expands, so this is lossy by design.
#[derive(Debug, Clone, Serialize)]
pub struct Histogram1D {
    axis: Axis,
    contents: Vec<Real>,
    underflow: Real,
    overflow: Real,
    entries: u64,
}

impl Histogram1D {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            contents: vec![0.0; axis.bins()],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        }
    }

    pub fn fill(&mut self, value: Real) {
        match self.axis.slot(value) {
            Slot::Underflow => self.underflow += 1.0,
            Slot::Overflow => self.overflow += 1.0,
            Slot::Bin(index) => {
                if let Some(bin) = self.contents.get_mut(index) {
                    *bin += 1.0;
                }
            }
        }
        self.entries += 1;
    }

    pub fn set_bin(&mut self, index: usize, value: Real) -> Result<(), MonitorError> {
        let bin = self
            .contents
            .get_mut(index)
            .ok_or(MonitorError::InvalidInput("bin index out of range"))?;
        *bin = value;
        Ok(())
    }

    pub fn add_to_bin(&mut self, index: usize, delta: Real) -> Result<(), MonitorError> {
        let bin = self
            .contents
            .get_mut(index)
            .ok_or(MonitorError::InvalidInput("bin index out of range"))?;
        *bin += delta;
        Ok(())
    }

    pub fn bin_content(&self, index: usize) -> Result<Real, MonitorError> {
        self.contents
            .get(index)
            .copied()
            .ok_or(MonitorError::InvalidInput("bin index out of range"))
    }

    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    pub fn contents(&self) -> &[Real] {
        &self.contents
    }

    pub fn underflow(&self) -> Real {
        self.underflow
    }

    pub fn overflow(&self) -> Real {
        self.overflow
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }
}

/// A 2-D statistical accumulator over two linear axes, row-major in y.
/// A fill outside either axis range increments the single out-of-range
/// counter.
#[derive(Debug, Clone, Serialize)]
pub struct Histogram2D {
    x: Axis,
    y: Axis,
    contents: Vec<Real>,
    outside: Real,
    entries: u64,
}

impl Histogram2D {
    pub fn new(x: Axis, y: Axis) -> Self {
        Self {
            x,
            y,
            contents: vec![0.0; x.bins() * y.bins()],
            outside: 0.0,
            entries: 0,
        }
    }

    pub fn fill(&mut self, x: Real, y: Real) {
        match (self.x.slot(x), self.y.slot(y)) {
            (Slot::Bin(ix), Slot::Bin(iy)) => {
                if let Some(bin) = self.contents.get_mut(iy * self.x.bins() + ix) {
                    *bin += 1.0;
                }
            }
            _ => self.outside += 1.0,
        }
        self.entries += 1;
    }

    pub fn bin_content(&self, ix: usize, iy: usize) -> Result<Real, MonitorError> {
        if ix >= self.x.bins() || iy >= self.y.bins() {
            return Err(MonitorError::InvalidInput("bin index out of range"));
        }
        self.contents
            .get(iy * self.x.bins() + ix)
            .copied()
            .ok_or(MonitorError::InvalidInput("bin index out of range"))
    }

    pub fn contents(&self) -> &[Real] {
        &self.contents
    }

    pub fn x_axis(&self) -> &Axis {
        &self.x
    }

    pub fn y_axis(&self) -> &Axis {
        &self.y
    }

    pub fn outside(&self) -> Real {
        self.outside
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }
}
