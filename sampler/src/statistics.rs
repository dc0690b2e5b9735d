use serde::Serialize;

/// Running sum and sum of squares of the stored samples.
///
/// With 16 bit samples the sums stay exact in `f64` for well over 2^20
/// samples, so the derived moments match a second pass over the buffer.
#[derive(Copy, Clone, PartialEq, Debug, Default, Serialize)]
pub struct Accumulator {
    sum: f64,
    sum2: f64,
    count: u32,
}

impl Accumulator {
    #[inline(always)]
    pub fn update(&mut self, x: u16) {
        let x = x as f64;
        self.sum += x;
        self.sum2 += x * x;
        self.count += 1;
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn sum_of_squares(&self) -> f64 {
        self.sum2
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Mean and population standard deviation in LSB.
    pub fn get(&self) -> Statistics {
        let mut stat = Statistics {
            count: self.count,
            mean: 0.,
            std: 0.,
        };
        if self.count != 0 {
            let c = 1. / self.count as f64;
            stat.mean = self.sum * c;
            // Rounding can push a zero variance slightly negative.
            let var = (self.sum2 * c - stat.mean * stat.mean).max(0.);
            stat.std = libm::sqrt(var);
        }
        stat
    }
}

#[derive(Copy, Clone, PartialEq, Debug, Default, Serialize)]
pub struct Statistics {
    pub count: u32,
    pub mean: f64,
    pub std: f64,
}

impl Statistics {
    /// Convert to physical units given the LSB `scale` and the `offset` of
    /// code zero.
    pub fn scaled(&self, scale: f32, offset: f32) -> ScaledStatistics {
        ScaledStatistics {
            count: self.count,
            mean: self.mean as f32 * scale + offset,
            std: self.std as f32 * scale,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug, Default, Serialize)]
pub struct ScaledStatistics {
    pub count: u32,
    pub mean: f32,
    pub std: f32,
}
