//! Mapping between linear position and cumulative arc length
//!
//! The mapper consumes a profile of `(x, f(x))` samples with strictly
//! increasing `x` and answers two questions: how much arc length has
//! accumulated by position `x`, and at which position a given arc length is
//! reached. Queries outside the sampled range extrapolate linearly along
//! the boundary segment.
//!
//! Callers scanning an image issue long runs of queries at nearly identical
//! positions. A [`Hint`] threaded through such a run remembers the last
//! segment and search direction, turning the per-query binary search into
//! an amortized O(1) neighbor check.
//!
//! # See also
//!
//! ScanTailor: `ArcLengthMapper.h`, `ArcLengthMapper.cpp`

/// A profile sample paired with the arc length accumulated up to it.
#[derive(Debug, Clone, Copy)]
struct Sample {
    x: f64,
    arc_len: f64,
    fx: f64,
}

/// A position resolved from an arc-length query, with the profile height
/// interpolated at that position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XSample {
    /// Position along the profile
    pub x: f64,
    /// Interpolated profile height at `x`
    pub fx: f64,
}

/// An arc length resolved from a position query, with the profile height
/// interpolated at that position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcLenSample {
    /// Accumulated arc length
    pub arc_len: f64,
    /// Interpolated profile height
    pub fx: f64,
}

/// Cursor caching the last segment a query resolved to.
///
/// Purely a performance cache: a fresh `Hint::default()` at any point gives
/// identical results. Never share one hint between interleaved query
/// streams moving in opposite directions.
#[derive(Debug, Clone, Copy)]
pub struct Hint {
    last_segment: usize,
    /// +1 or -1; which neighbor to probe first on a miss.
    direction: isize,
}

impl Default for Hint {
    fn default() -> Self {
        Self {
            last_segment: 0,
            direction: 1,
        }
    }
}

impl Hint {
    fn update(&mut self, new_segment: usize) {
        self.direction = if new_segment < self.last_segment { -1 } else { 1 };
        self.last_segment = new_segment;
    }

    fn probe(&self, offset: isize, num_segments: usize) -> Option<usize> {
        let idx = self.last_segment.checked_add_signed(offset * self.direction)?;
        (idx < num_segments).then_some(idx)
    }
}

/// Monotonic position to arc-length mapping built from profile samples.
#[derive(Debug, Clone, Default)]
pub struct ArcLengthMapper {
    samples: Vec<Sample>,
    prev_fx: f64,
}

impl ArcLengthMapper {
    /// Create an empty mapper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a profile sample.
    ///
    /// Samples must arrive in increasing `x` order; a sample whose `x` does
    /// not advance past the previous one is dropped, as is any non-finite
    /// sample.
    pub fn add_sample(&mut self, x: f64, fx: f64) {
        if !x.is_finite() || !fx.is_finite() {
            return;
        }
        if let Some(last) = self.samples.last() {
            let dx = x - last.x;
            if dx <= f64::EPSILON {
                return;
            }
            let dfx = fx - self.prev_fx;
            let arc_len = last.arc_len + dx.hypot(dfx);
            self.samples.push(Sample { x, arc_len, fx });
        } else {
            self.samples.push(Sample {
                x,
                arc_len: 0.0,
                fx,
            });
        }
        self.prev_fx = fx;
    }

    /// Total accumulated arc length, or 0 with fewer than 2 samples.
    pub fn total_arc_length(&self) -> f64 {
        if self.samples.len() > 1 {
            self.samples[self.samples.len() - 1].arc_len
        } else {
            0.0
        }
    }

    /// Rescale so the total arc length becomes `total_arc_len`.
    ///
    /// A no-op on a mapper with zero total arc length.
    pub fn normalize_range(&mut self, total_arc_len: f64) {
        let total = self.total_arc_length();
        if total <= f64::EPSILON {
            return;
        }
        let scale = total_arc_len / total;
        for sample in &mut self.samples {
            sample.arc_len *= scale;
        }
    }

    /// Whether the mapper holds enough samples to interpolate.
    pub fn is_usable(&self) -> bool {
        self.samples.len() >= 2
    }

    /// Arc length and profile height at position `x`.
    ///
    /// Returns zeros with fewer than 2 samples.
    pub fn x_to_arc_len_sample(&self, x: f64, hint: &mut Hint) -> ArcLenSample {
        if !self.is_usable() {
            return ArcLenSample {
                arc_len: 0.0,
                fx: 0.0,
            };
        }
        let segment = self.find_segment(x, hint, |s| s.x);
        let s0 = self.samples[segment];
        let s1 = self.samples[segment + 1];
        let t = (x - s0.x) / (s1.x - s0.x);
        ArcLenSample {
            arc_len: s0.arc_len + t * (s1.arc_len - s0.arc_len),
            fx: s0.fx + t * (s1.fx - s0.fx),
        }
    }

    /// Position and profile height at which `arc_len` is accumulated.
    ///
    /// Returns zeros with fewer than 2 samples.
    pub fn arc_len_to_x_sample(&self, arc_len: f64, hint: &mut Hint) -> XSample {
        if !self.is_usable() {
            return XSample { x: 0.0, fx: 0.0 };
        }
        let segment = self.find_segment(arc_len, hint, |s| s.arc_len);
        let s0 = self.samples[segment];
        let s1 = self.samples[segment + 1];
        // arc_len is strictly increasing; a flat run would mean duplicate
        // x, which add_sample rejects.
        let t = (arc_len - s0.arc_len) / (s1.arc_len - s0.arc_len);
        XSample {
            x: s0.x + t * (s1.x - s0.x),
            fx: s0.fx + t * (s1.fx - s0.fx),
        }
    }

    /// Arc length accumulated by position `x`.
    pub fn x_to_arc_len(&self, x: f64, hint: &mut Hint) -> f64 {
        self.x_to_arc_len_sample(x, hint).arc_len
    }

    /// Position at which `arc_len` is accumulated.
    pub fn arc_len_to_x(&self, arc_len: f64, hint: &mut Hint) -> f64 {
        self.arc_len_to_x_sample(arc_len, hint).x
    }

    /// Locate the segment whose `key` range contains `v`, with boundary
    /// segments owning everything beyond the sampled range.
    fn find_segment(&self, v: f64, hint: &mut Hint, key: impl Fn(&Sample) -> f64) -> usize {
        let num_segments = self.samples.len() - 1;

        if self.segment_contains(v, hint.last_segment, &key) {
            return hint.last_segment;
        }
        for offset in [1, -1] {
            if let Some(idx) = hint.probe(offset, num_segments) {
                if self.segment_contains(v, idx, &key) {
                    hint.update(idx);
                    return idx;
                }
            }
        }

        let idx = self
            .samples
            .partition_point(|s| key(s) <= v)
            .saturating_sub(1)
            .min(num_segments - 1);
        hint.update(idx);
        idx
    }

    fn segment_contains(&self, v: f64, segment: usize, key: &impl Fn(&Sample) -> f64) -> bool {
        let num_segments = self.samples.len() - 1;
        if segment >= num_segments {
            return false;
        }
        if segment > 0 && v < key(&self.samples[segment]) {
            return false;
        }
        if segment < num_segments - 1 && v > key(&self.samples[segment + 1]) {
            return false;
        }
        true
    }
}
