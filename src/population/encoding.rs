//! Bit-string encoding of integer genes.
//!
//! An integer variable on `[lb, ub]` is stored as the offset `x - ceil(lb)` in the
//! fewest bits that hold every offset. Codes past the range, which crossover and bit flips
//! can produce when the range is not a power of two, decode to the upper bound.

use num_traits::ToPrimitive;

use crate::sampling::Sampler;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BitGene {
    lo: f64,
    span: u64,
    bits: u32,
}

impl BitGene {
    /// The gene of an integer variable with bounds `lb <= ub`, `None` when the range holds
    /// more integers than a 64 bit code can address.
    pub fn new(lb: f64, ub: f64) -> Option<Self> {
        let lo = lb.ceil();
        let span = (ub.floor() - lo).to_u64()?;
        let bits = (64 - span.leading_zeros()).max(1);
        Some(BitGene { lo, span, bits })
    }

    /// Number of bits in the string.
    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Number of representable integers.
    #[inline]
    pub fn values(&self) -> u64 {
        self.span + 1
    }

    pub fn encode(&self, x: f64) -> u64 {
        (x.round() - self.lo).to_u64().unwrap_or(0).min(self.span)
    }

    pub fn decode(&self, code: u64) -> f64 {
        self.lo + code.min(self.span) as f64
    }

    /// One-point crossover: the children swap the `cut` low bits.
    pub fn crossover(&self, a: u64, b: u64, cut: u32) -> (u64, u64) {
        let low = if cut >= 64 { u64::MAX } else { (1u64 << cut) - 1 };
        ((a & !low) | (b & low), (b & !low) | (a & low))
    }

    /// Flips every bit independently with probability `p`.
    pub fn mutate(&self, code: u64, p: f64, sampler: &mut Sampler) -> u64 {
        let mut code = code;
        for bit in 0..self.bits {
            if sampler.coin(p) {
                code ^= 1u64 << bit;
            }
        }
        code
    }
}
