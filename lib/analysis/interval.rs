//! The interval abstract domain.
//!
//! An `Interval` over-approximates the set of values a fixed width, signed
//! two's complement integer may hold. Every arithmetic operation is computed
//! exactly over 128-bit integers and the result is then wrapped back into the
//! width. When the wrapped values no longer form one contiguous range, the
//! result is the full range of the width.

use crate::il::{self, Comparison};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, PartialOrd};
use std::fmt;

/// An interval of signed integers of a fixed width.
///
/// A `Range` never covers the whole width. That interval is always
/// represented as `Top`, so structural equality is lattice equality.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "SerializedInterval", into = "SerializedInterval")]
pub enum Interval {
    /// No value. The point holding it is unreachable.
    Bottom(usize),
    /// Every value from `lo` to `hi`, inclusive.
    Range { bits: usize, lo: i64, hi: i64 },
    /// Any value of the width.
    Top(usize),
}

impl Interval {
    /// Create the interval `[lo, hi]`.
    ///
    /// Bounds are clamped into the range of `bits`. An empty interval is
    /// `Bottom`, and an interval covering the whole width is `Top`.
    pub fn new(bits: usize, lo: i64, hi: i64) -> Interval {
        let lo = lo.max(il::min_value(bits));
        let hi = hi.min(il::max_value(bits));
        if lo > hi {
            Interval::Bottom(bits)
        } else if lo == il::min_value(bits) && hi == il::max_value(bits) {
            Interval::Top(bits)
        } else {
            Interval::Range { bits, lo, hi }
        }
    }

    /// The interval holding exactly `value`, wrapped into `bits`.
    pub fn constant(bits: usize, value: i64) -> Interval {
        let value = il::wrap(value as i128, bits);
        Interval::new(bits, value, value)
    }

    pub fn top(bits: usize) -> Interval {
        Interval::Top(bits)
    }

    pub fn bottom(bits: usize) -> Interval {
        Interval::Bottom(bits)
    }

    /// The interval of the values in `[lo, hi]` after wrapping them into
    /// `bits`.
    ///
    /// If the exact interval holds fewer values than the width can represent,
    /// and its bounds wrap without crossing each other, the wrapped interval is
    /// precise. Otherwise the result is `Top`.
    pub fn from_exact(bits: usize, lo: i128, hi: i128) -> Interval {
        if lo > hi {
            return Interval::Bottom(bits);
        }
        if hi - lo >= (1i128 << bits) {
            return Interval::Top(bits);
        }
        let (lo, hi) = (il::wrap(lo, bits), il::wrap(hi, bits));
        if lo <= hi {
            Interval::new(bits, lo, hi)
        } else {
            Interval::Top(bits)
        }
    }

    /// The width of this interval in bits.
    pub fn bits(&self) -> usize {
        match *self {
            Interval::Bottom(bits) | Interval::Top(bits) | Interval::Range { bits, .. } => bits,
        }
    }

    /// The smallest and largest value in this interval, or `None` for `Bottom`.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        match *self {
            Interval::Bottom(_) => None,
            Interval::Range { lo, hi, .. } => Some((lo, hi)),
            Interval::Top(bits) => Some((il::min_value(bits), il::max_value(bits))),
        }
    }

    pub fn lo(&self) -> Option<i64> {
        self.bounds().map(|(lo, _)| lo)
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, Interval::Bottom(_))
    }

    pub fn is_top(&self) -> bool {
        matches!(self, Interval::Top(_))
    }

    /// If this interval holds exactly one value, return it.
    pub fn value(&self) -> Option<i64> {
        match self.bounds() {
            Some((lo, hi)) if lo == hi => Some(lo),
            _ => None,
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        match self.bounds() {
            Some((lo, hi)) => lo <= value && value <= hi,
            None => false,
        }
    }

    /// The least upper bound of two intervals.
    pub fn join(&self, other: &Interval) -> Interval {
        if self.bits() != other.bits() {
            return Interval::Top(self.bits());
        }
        match (self.bounds(), other.bounds()) {
            (None, _) => *other,
            (_, None) => *self,
            (Some((llo, lhi)), Some((rlo, rhi))) => {
                Interval::new(self.bits(), llo.min(rlo), lhi.max(rhi))
            }
        }
    }

    /// The greatest lower bound of two intervals. `Bottom` if they are
    /// disjoint.
    pub fn meet(&self, other: &Interval) -> Interval {
        if self.bits() != other.bits() {
            return *self;
        }
        match (self.bounds(), other.bounds()) {
            (Some((llo, lhi)), Some((rlo, rhi))) => {
                Interval::new(self.bits(), llo.max(rlo), lhi.min(rhi))
            }
            _ => Interval::Bottom(self.bits()),
        }
    }

    /// Widen `self`, the previous value, with `new`.
    ///
    /// A bound that grew jumps straight to the limit of the width, so any
    /// ascending chain of widenings stabilizes after at most two steps per
    /// bound.
    pub fn widen(&self, new: &Interval) -> Interval {
        if self.bits() != new.bits() {
            return Interval::Top(self.bits());
        }
        let bits = self.bits();
        match (self.bounds(), new.bounds()) {
            (None, _) => *new,
            (_, None) => *self,
            (Some((olo, ohi)), Some((nlo, nhi))) => {
                let lo = if nlo < olo { il::min_value(bits) } else { olo };
                let hi = if nhi > ohi { il::max_value(bits) } else { ohi };
                Interval::new(bits, lo, hi)
            }
        }
    }

    fn exact(&self) -> Option<(i128, i128)> {
        self.bounds().map(|(lo, hi)| (lo as i128, hi as i128))
    }

    /// Apply `f` to the exact bounds of two intervals, wrapping the result.
    fn binary<F>(&self, other: &Interval, f: F) -> Interval
    where
        F: Fn(i128, i128, i128, i128) -> (i128, i128),
    {
        match (self.exact(), other.exact()) {
            (Some((llo, lhi)), Some((rlo, rhi))) => {
                let (lo, hi) = f(llo, lhi, rlo, rhi);
                Interval::from_exact(self.bits(), lo, hi)
            }
            _ => Interval::Bottom(self.bits()),
        }
    }

    pub fn add(&self, other: &Interval) -> Interval {
        self.binary(other, |llo, lhi, rlo, rhi| (llo + rlo, lhi + rhi))
    }

    pub fn sub(&self, other: &Interval) -> Interval {
        self.binary(other, |llo, lhi, rlo, rhi| (llo - rhi, lhi - rlo))
    }

    pub fn mul(&self, other: &Interval) -> Interval {
        self.binary(other, |llo, lhi, rlo, rhi| {
            let corners = [llo * rlo, llo * rhi, lhi * rlo, lhi * rhi];
            corners_hull(&corners)
        })
    }

    pub fn neg(&self) -> Interval {
        match self.exact() {
            Some((lo, hi)) => Interval::from_exact(self.bits(), -hi, -lo),
            None => *self,
        }
    }

    /// Bitwise complement, `-x - 1`.
    pub fn not(&self) -> Interval {
        match self.exact() {
            Some((lo, hi)) => Interval::from_exact(self.bits(), -hi - 1, -lo - 1),
            None => *self,
        }
    }

    /// The parts of `self` below and above zero.
    fn without_zero(&self) -> Vec<(i128, i128)> {
        let mut parts = Vec::new();
        if let Some((lo, hi)) = self.exact() {
            if lo <= -1 {
                parts.push((lo, hi.min(-1)));
            }
            if hi >= 1 {
                parts.push((lo.max(1), hi));
            }
        }
        parts
    }

    /// Signed division, truncating toward zero.
    ///
    /// A divisor of exactly zero traps at runtime. Its result is `Top`.
    pub fn div(&self, other: &Interval) -> Interval {
        let bits = self.bits();
        let (lo, hi) = match self.exact() {
            Some(bounds) => bounds,
            None => return Interval::Bottom(bits),
        };
        if other.is_bottom() {
            return Interval::Bottom(bits);
        }
        let divisors = other.without_zero();
        if divisors.is_empty() {
            return Interval::Top(bits);
        }
        let mut corners = Vec::new();
        for (dlo, dhi) in divisors {
            corners.extend([lo / dlo, lo / dhi, hi / dlo, hi / dhi]);
        }
        let (lo, hi) = corners_hull(&corners);
        Interval::from_exact(bits, lo, hi)
    }

    /// Signed remainder. The result takes the sign of the dividend and is
    /// smaller in magnitude than the divisor.
    pub fn rem(&self, other: &Interval) -> Interval {
        let bits = self.bits();
        let (lo, hi) = match self.exact() {
            Some(bounds) => bounds,
            None => return Interval::Bottom(bits),
        };
        if other.is_bottom() {
            return Interval::Bottom(bits);
        }
        let divisors = other.without_zero();
        if divisors.is_empty() {
            return Interval::Top(bits);
        }
        let magnitude = divisors
            .iter()
            .map(|&(dlo, dhi)| dlo.abs().max(dhi.abs()))
            .max()
            .unwrap_or(1)
            - 1;
        let rlo = if lo >= 0 { 0 } else { lo.max(-magnitude) };
        let rhi = if hi <= 0 { 0 } else { hi.min(magnitude) };
        Interval::from_exact(bits, rlo, rhi)
    }

    pub fn and(&self, other: &Interval) -> Interval {
        let bits = self.bits();
        match (self.bounds(), other.bounds()) {
            (None, _) | (_, None) => Interval::Bottom(bits),
            (Some((llo, lhi)), Some((rlo, rhi))) => {
                if llo >= 0 && rlo >= 0 {
                    Interval::new(bits, 0, lhi.min(rhi))
                } else if llo >= 0 {
                    Interval::new(bits, 0, lhi)
                } else if rlo >= 0 {
                    Interval::new(bits, 0, rhi)
                } else {
                    Interval::Top(bits)
                }
            }
        }
    }

    pub fn or(&self, other: &Interval) -> Interval {
        let bits = self.bits();
        match (self.bounds(), other.bounds()) {
            (None, _) | (_, None) => Interval::Bottom(bits),
            (Some((llo, lhi)), Some((rlo, rhi))) if llo >= 0 && rlo >= 0 => {
                Interval::new(bits, llo.max(rlo), all_ones_above(lhi.max(rhi)))
            }
            _ => Interval::Top(bits),
        }
    }

    pub fn xor(&self, other: &Interval) -> Interval {
        let bits = self.bits();
        match (self.bounds(), other.bounds()) {
            (None, _) | (_, None) => Interval::Bottom(bits),
            (Some((llo, lhi)), Some((rlo, rhi))) if llo >= 0 && rlo >= 0 => {
                Interval::new(bits, 0, all_ones_above(lhi.max(rhi)))
            }
            _ => Interval::Top(bits),
        }
    }

    /// The shift amount, if `other` is a single value. Amounts are reduced
    /// modulo the width, as the JVM does for 32 and 64 bit shifts.
    fn shift_amount(&self, other: &Interval) -> Option<u32> {
        other
            .value()
            .map(|amount| amount.rem_euclid(self.bits() as i64) as u32)
    }

    pub fn shl(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::Bottom(self.bits());
        }
        match (self.exact(), self.shift_amount(other)) {
            (Some((lo, hi)), Some(amount)) => {
                Interval::from_exact(self.bits(), lo << amount, hi << amount)
            }
            _ => Interval::Top(self.bits()),
        }
    }

    /// Arithmetic shift right.
    pub fn shr(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::Bottom(self.bits());
        }
        match (self.bounds(), self.shift_amount(other)) {
            (Some((lo, hi)), Some(amount)) => Interval::new(self.bits(), lo >> amount, hi >> amount),
            (Some((lo, hi)), None) if lo >= 0 => Interval::new(self.bits(), 0, hi),
            _ => Interval::Top(self.bits()),
        }
    }

    /// Logical shift right.
    pub fn ushr(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::Bottom(self.bits());
        }
        match (self.bounds(), self.shift_amount(other)) {
            (Some(_), Some(0)) => *self,
            (Some((lo, _)), _) if lo >= 0 => self.shr(other),
            _ => Interval::Top(self.bits()),
        }
    }

    /// Truncate or sign extend this interval to `bits`.
    ///
    /// When the source values do not map onto one contiguous range of the
    /// target width, the result is the whole target range.
    pub fn cast(&self, bits: usize) -> Interval {
        match self.exact() {
            Some((lo, hi)) => Interval::from_exact(bits, lo, hi),
            None => Interval::Bottom(bits),
        }
    }

    /// The values of `self` for which some value of `other` satisfies
    /// `self <comparison> other`.
    ///
    /// `!=` can only be expressed by an interval when `other` is a single
    /// value at one end of `self`. In every other case it leaves `self`
    /// untouched.
    pub fn refine(&self, comparison: Comparison, other: &Interval) -> Interval {
        let bits = self.bits();
        let (olo, ohi) = match (self.bounds(), other.bounds()) {
            (Some(_), Some(bounds)) => bounds,
            _ => return Interval::Bottom(bits),
        };
        let (min, max) = (il::min_value(bits), il::max_value(bits));

        match comparison {
            Comparison::Eq => self.meet(other),
            Comparison::Ne => match (self.bounds(), other.value()) {
                (Some((lo, hi)), Some(value)) => {
                    if lo == value && hi == value {
                        Interval::Bottom(bits)
                    } else if lo == value {
                        Interval::new(bits, lo + 1, hi)
                    } else if hi == value {
                        Interval::new(bits, lo, hi - 1)
                    } else {
                        *self
                    }
                }
                _ => *self,
            },
            Comparison::Lt => {
                if ohi == min {
                    Interval::Bottom(bits)
                } else {
                    self.meet(&Interval::new(bits, min, ohi - 1))
                }
            }
            Comparison::Le => self.meet(&Interval::new(bits, min, ohi)),
            Comparison::Gt => {
                if olo == max {
                    Interval::Bottom(bits)
                } else {
                    self.meet(&Interval::new(bits, olo + 1, max))
                }
            }
            Comparison::Ge => self.meet(&Interval::new(bits, olo, max)),
        }
    }
}

fn corners_hull(corners: &[i128]) -> (i128, i128) {
    let lo = corners.iter().cloned().min().unwrap_or(0);
    let hi = corners.iter().cloned().max().unwrap_or(0);
    (lo, hi)
}

/// The smallest `2^n - 1` not below `value`, for non-negative `value`.
fn all_ones_above(value: i64) -> i64 {
    let mut ones: i64 = 0;
    while ones < value {
        ones = (ones << 1) | 1;
    }
    ones
}

impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Interval) -> Option<Ordering> {
        if self.bits() != other.bits() {
            return None;
        }
        if self == other {
            return Some(Ordering::Equal);
        }
        match (self.bounds(), other.bounds()) {
            (None, _) => Some(Ordering::Less),
            (_, None) => Some(Ordering::Greater),
            (Some((llo, lhi)), Some((rlo, rhi))) => {
                if rlo <= llo && lhi <= rhi {
                    Some(Ordering::Less)
                } else if llo <= rlo && rhi <= lhi {
                    Some(Ordering::Greater)
                } else {
                    None
                }
            }
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Interval::Bottom(bits) => write!(f, "bottom:{}", bits),
            Interval::Range { bits, lo, hi } => write!(f, "[{}, {}]:{}", lo, hi, bits),
            Interval::Top(bits) => write!(f, "top:{}", bits),
        }
    }
}

/// The serialized form of an `Interval`.
///
/// Deserialization goes through `Interval::try_from`, which rejects widths
/// and bounds `Interval::new` would never produce.
#[derive(Clone, Debug, Deserialize, Serialize)]
enum SerializedInterval {
    Bottom(usize),
    Range { bits: usize, lo: i64, hi: i64 },
    Top(usize),
}

impl TryFrom<SerializedInterval> for Interval {
    type Error = Error;

    fn try_from(serialized: SerializedInterval) -> Result<Interval, Error> {
        let bits = match serialized {
            SerializedInterval::Bottom(bits)
            | SerializedInterval::Top(bits)
            | SerializedInterval::Range { bits, .. } => bits,
        };
        if !il::valid_bits(bits) {
            return Err(Error::InvalidBits(bits));
        }
        match serialized {
            SerializedInterval::Bottom(bits) => Ok(Interval::Bottom(bits)),
            SerializedInterval::Top(bits) => Ok(Interval::Top(bits)),
            SerializedInterval::Range { bits, lo, hi } => {
                if lo > hi || lo < il::min_value(bits) || hi > il::max_value(bits) {
                    return Err(Error::Analysis(format!(
                        "[{}, {}] is not an interval of {} bits",
                        lo, hi, bits
                    )));
                }
                Ok(Interval::new(bits, lo, hi))
            }
        }
    }
}

impl From<Interval> for SerializedInterval {
    fn from(interval: Interval) -> SerializedInterval {
        match interval {
            Interval::Bottom(bits) => SerializedInterval::Bottom(bits),
            Interval::Range { bits, lo, hi } => SerializedInterval::Range { bits, lo, hi },
            Interval::Top(bits) => SerializedInterval::Top(bits),
        }
    }
}
