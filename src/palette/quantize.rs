//! Modified median cut quantization.
//!
//! Pixels are binned into a 5-bit-per-channel histogram. Boxes around the
//! occupied bins are split at the population median of their longest axis,
//! first by population and then by population times volume, until the
//! requested number of boxes exists or nothing can be split further. Each box
//! contributes the exact mean of its pixels.

use crate::color::Color;
use crate::ingest::Bitmap;
use crate::{Error, Result};

const SIGBITS: u32 = 5;
const RSHIFT: u32 = 8 - SIGBITS;
const SIDE: usize = 1 << SIGBITS;
const FRACT_BY_POPULATION: f64 = 0.75;
const MIN_ALPHA: u8 = 125;

/// Derives an ordered set of representative colors from a bitmap.
///
/// Implementations must be deterministic: the same bitmap and count always
/// give the same colors in the same order.
pub trait Quantizer: Send + Sync {
    fn quantize(&self, bitmap: &Bitmap, count: usize) -> Result<Vec<Color>>;
}

/// Median cut over a sparse color histogram.
#[derive(Debug, Clone)]
pub struct MedianCut {
    /// Only every `sample_step`-th pixel is counted (1 = every pixel).
    pub sample_step: usize,
}

impl Default for MedianCut {
    fn default() -> Self {
        Self { sample_step: 1 }
    }
}

impl MedianCut {
    pub fn new(sample_step: usize) -> Self {
        Self { sample_step: sample_step.max(1) }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Bin {
    count: u64,
    sum: [u64; 3],
}

struct Histogram {
    bins: Vec<Bin>,
}

fn index(c: [usize; 3]) -> usize {
    (c[0] << (2 * SIGBITS)) | (c[1] << SIGBITS) | c[2]
}

impl Histogram {
    fn build(bitmap: &Bitmap, step: usize) -> Self {
        let mut bins = vec![Bin::default(); SIDE * SIDE * SIDE];
        for px in bitmap.pixels().step_by(step) {
            if px[3] < MIN_ALPHA {
                continue;
            }
            let key = [
                (px[0] >> RSHIFT) as usize,
                (px[1] >> RSHIFT) as usize,
                (px[2] >> RSHIFT) as usize,
            ];
            let bin = &mut bins[index(key)];
            bin.count += 1;
            for (s, v) in bin.sum.iter_mut().zip(&px[..3]) {
                *s += *v as u64;
            }
        }
        Self { bins }
    }

    fn get(&self, c: [usize; 3]) -> &Bin {
        &self.bins[index(c)]
    }
}

/// Inclusive bounds in histogram space plus the cached population.
#[derive(Debug, Clone)]
struct VBox {
    lo: [usize; 3],
    hi: [usize; 3],
    count: u64,
}

impl VBox {
    fn volume(&self) -> u64 {
        (0..3).map(|a| (self.hi[a] - self.lo[a] + 1) as u64).product()
    }

    fn cells(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        (self.lo[0]..=self.hi[0]).flat_map(move |r| {
            (self.lo[1]..=self.hi[1])
                .flat_map(move |g| (self.lo[2]..=self.hi[2]).map(move |b| [r, g, b]))
        })
    }

    /// Shrink to the occupied bins. Returns `None` when the box is empty.
    fn fitted(lo: [usize; 3], hi: [usize; 3], hist: &Histogram) -> Option<VBox> {
        let probe = VBox { lo, hi, count: 0 };
        let mut min = [usize::MAX; 3];
        let mut max = [0usize; 3];
        let mut count = 0;
        for c in probe.cells() {
            let n = hist.get(c).count;
            if n == 0 {
                continue;
            }
            count += n;
            for a in 0..3 {
                min[a] = min[a].min(c[a]);
                max[a] = max[a].max(c[a]);
            }
        }
        (count > 0).then_some(VBox { lo: min, hi: max, count })
    }

    fn splittable(&self) -> bool {
        (0..3).any(|a| self.hi[a] > self.lo[a])
    }

    fn split(&self, hist: &Histogram) -> Option<(VBox, VBox)> {
        if !self.splittable() {
            return None;
        }
        // Longest axis; ties prefer red, then green.
        let axis = (0..3)
            .rev()
            .max_by_key(|&a| self.hi[a] - self.lo[a])
            .unwrap_or(0);

        let mut slices = vec![0u64; self.hi[axis] - self.lo[axis] + 1];
        for c in self.cells() {
            slices[c[axis] - self.lo[axis]] += hist.get(c).count;
        }
        let half = self.count / 2;
        let mut acc = 0;
        let mut median = self.hi[axis];
        for (i, n) in slices.iter().enumerate() {
            acc += n;
            if acc > half {
                median = self.lo[axis] + i;
                break;
            }
        }
        // Both halves keep at least the boundary slice, which is occupied
        // because boxes are always fitted.
        let cut = if median >= self.hi[axis] { self.hi[axis] - 1 } else { median };

        let mut left_hi = self.hi;
        left_hi[axis] = cut;
        let mut right_lo = self.lo;
        right_lo[axis] = cut + 1;
        let left = VBox::fitted(self.lo, left_hi, hist)?;
        let right = VBox::fitted(right_lo, self.hi, hist)?;
        Some((left, right))
    }

    fn average(&self, hist: &Histogram) -> Color {
        let mut sum = [0u64; 3];
        let mut n = 0u64;
        for c in self.cells() {
            let bin = hist.get(c);
            n += bin.count;
            for a in 0..3 {
                sum[a] += bin.sum[a];
            }
        }
        let n = n.max(1);
        let ch = |a: usize| ((sum[a] + n / 2) / n).min(255) as u8;
        Color::new(ch(0), ch(1), ch(2))
    }
}

/// Split the highest-priority splittable box until `target` boxes exist.
fn split_until(boxes: &mut Vec<VBox>, target: usize, hist: &Histogram, priority: fn(&VBox) -> u64) {
    while boxes.len() < target {
        let pick = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.splittable())
            .max_by(|(ia, a), (ib, b)| priority(a).cmp(&priority(b)).then(ib.cmp(ia)))
            .map(|(i, _)| i);
        let Some(i) = pick else { break };
        match boxes[i].split(hist) {
            Some((left, right)) => {
                boxes[i] = left;
                boxes.insert(i + 1, right);
            }
            None => break,
        }
    }
}

impl Quantizer for MedianCut {
    fn quantize(&self, bitmap: &Bitmap, count: usize) -> Result<Vec<Color>> {
        if count == 0 {
            return Err(Error::QuantizeError("color count must be at least 1".to_string()));
        }
        if bitmap.is_empty() {
            return Err(Error::QuantizeError("bitmap has no pixels".to_string()));
        }
        let hist = Histogram::build(bitmap, self.sample_step.max(1));
        let root = VBox::fitted([0; 3], [SIDE - 1; 3], &hist)
            .ok_or_else(|| Error::QuantizeError("bitmap has no opaque pixels".to_string()))?;

        let mut boxes = vec![root];
        let by_population = ((count as f64) * FRACT_BY_POPULATION).ceil() as usize;
        split_until(&mut boxes, by_population.max(1), &hist, |b| b.count);
        split_until(&mut boxes, count, &hist, |b| b.count * b.volume());

        // Dominant first; stable on ties so the order stays deterministic.
        boxes.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(boxes.iter().map(|b| b.average(&hist)).collect())
    }
}
