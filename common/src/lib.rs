pub mod metrics;

pub type Channel = u32;
pub type Intensity = u16;
pub type CounterId = u32;
pub type TriggerBits = u32;
pub type Real = f64;

/// Number of trigger-pattern bits the monitor tracks categories for.
pub const MAX_CATEGORIES: usize = 16;

/// A trigger-pattern bit index under which every aggregated quantity is
/// separately tracked. Always in `[0, MAX_CATEGORIES)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category(u8);

impl Category {
    pub fn new(index: u8) -> Option<Self> {
        ((index as usize) < MAX_CATEGORIES).then_some(Self(index))
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn bit(&self) -> TriggerBits {
        1 << self.0
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Iterates the categories whose bits are set in `mask`, lowest bit first.
pub fn categories_in(mask: TriggerBits) -> impl Iterator<Item = Category> {
    (0..MAX_CATEGORIES as u8)
        .filter_map(Category::new)
        .filter(move |category| mask & category.bit() != 0)
}

/// The two auxiliary tagger detector groups features are correlated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TaggerKind {
    Hodoscope,
    Microscope,
}

/// How a feature was derived. Both views of the same physical quantity are
/// aggregated under distinct metric names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum FeatureMethod {
    FromWaveform,
    FromPulses,
}
