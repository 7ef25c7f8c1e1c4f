use heapless::LinearMap;

/// Samples collected before the graph is redrawn.
pub const RING_CAPACITY: usize = 20;
/// Largest raw value of the 12 bit ADC.
pub const ADC_MAX: u16 = 4095;
/// Lower graph bound sits this far below the smallest sample...
pub const GRAPH_MARGIN: u16 = 50;
/// ...but never below this.
pub const GRAPH_FLOOR: u16 = 50;

/// Analog inputs of the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum SensorChannel {
    Soil,
    Light,
    Ambient,
    Temperature,
}

impl SensorChannel {
    pub fn index(self) -> u8 {
        match self {
            SensorChannel::Soil => 0,
            SensorChannel::Light => 1,
            SensorChannel::Ambient => 2,
            SensorChannel::Temperature => 3,
        }
    }
}

impl TryFrom<i32> for SensorChannel {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SensorChannel::Soil),
            1 => Ok(SensorChannel::Light),
            2 => Ok(SensorChannel::Ambient),
            3 => Ok(SensorChannel::Temperature),
            other => Err(other),
        }
    }
}

/// Fill-then-flush sample buffer.
///
/// Samples are appended until the buffer is full; further samples are
/// dropped until the graph renderer flushes it with [`SampleRing::take_full`].
pub struct SampleRing {
    samples: [u16; RING_CAPACITY],
    cursor: usize,
}

impl SampleRing {
    pub const fn new() -> Self {
        Self {
            samples: [0; RING_CAPACITY],
            cursor: 0,
        }
    }

    /// Appends a reading. Returns true once the buffer is full.
    pub fn push(&mut self, sample: u16) -> bool {
        if self.cursor < RING_CAPACITY {
            self.samples[self.cursor] = sample.min(ADC_MAX);
            self.cursor += 1;
        }
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.cursor == RING_CAPACITY
    }

    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Copies the samples out and restarts filling, but only once full.
    pub fn take_full(&mut self) -> Option<[u16; RING_CAPACITY]> {
        if !self.is_full() {
            return None;
        }
        self.cursor = 0;
        Some(self.samples)
    }
}

impl Default for SampleRing {
    fn default() -> Self {
        Self::new()
    }
}

/// Occurrence count per raw sample value.
pub struct Histogram {
    counts: LinearMap<u16, u8, RING_CAPACITY>,
    min: u16,
    max: u16,
}

impl Histogram {
    pub fn new() -> Self {
        Self {
            counts: LinearMap::new(),
            min: ADC_MAX,
            max: 0,
        }
    }

    pub fn from_samples(samples: &[u16]) -> Self {
        let mut histogram = Self::new();
        for &sample in samples {
            histogram.add(sample);
        }
        histogram
    }

    /// Counts one sample. Distinct values beyond the ring capacity are not
    /// tracked, which cannot happen when fed from one full ring.
    pub fn add(&mut self, sample: u16) {
        let sample = sample.min(ADC_MAX);
        if let Some(count) = self.counts.get_mut(&sample) {
            *count = count.saturating_add(1);
        } else if self.counts.insert(sample, 1).is_err() {
            return;
        }
        self.min = self.min.min(sample);
        self.max = self.max.max(sample);
    }

    pub fn count(&self, value: u16) -> u8 {
        self.counts.get(&value).copied().unwrap_or(0)
    }

    /// Axis range of the plot: `max(min - 50, 50)..=max`.
    /// `None` when empty or when every sample lies below the floor.
    pub fn bounds(&self) -> Option<(u16, u16)> {
        if self.counts.is_empty() {
            return None;
        }
        let low = self.min.saturating_sub(GRAPH_MARGIN).max(GRAPH_FLOOR);
        (low <= self.max).then_some((low, self.max))
    }

    /// Non-empty buckets inside [`Histogram::bounds`], in ascending value order.
    pub fn bars(&self) -> impl Iterator<Item = (u16, u8)> + '_ {
        let (low, high) = self.bounds().unwrap_or((1, 0));
        (low..=high).filter_map(move |value| match self.count(value) {
            0 => None,
            count => Some((value, count)),
        })
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}
