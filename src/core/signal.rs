//! Fixed-width logic values. Each bit is 0, 1 or floating; a vector whose
//! bits all float is the distinguished fully-floating (Hi-Z) marker.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Widest representable signal. Wider vectors are rejected at circuit
/// construction time.
pub const MAX_WIDTH: u32 = 64;

/// A single logic level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bit {
    Zero,
    One,
    Floating,
}

/// Error raised by the checked [`Signal`] constructor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("signal width {0} exceeds the supported maximum of {MAX_WIDTH} bits")]
    WidthOutOfRange(u32),
}

/// A fixed-width vector of tri-valued bits.
///
/// Stored as two bit masks over a machine word: `bits` holds the driven
/// levels, `floats` marks bits that no source is driving. A set `floats`
/// bit forces the corresponding `bits` bit to zero, so bitwise equality
/// of the three fields is value equality. The width-0 signal is what an
/// unattached pin reads and compares equal only to itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signal {
    width: u8,
    bits: u64,
    floats: u64,
}

fn mask(width: u32) -> u64 {
    if width == 0 {
        0
    } else if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

impl Signal {
    /// Checked constructor. `bits` above the width are truncated.
    pub fn new(width: u32, bits: u64) -> Result<Self, SignalError> {
        if width > MAX_WIDTH {
            return Err(SignalError::WidthOutOfRange(width));
        }
        Ok(Self::from_u64(width, bits))
    }

    /// The width-0 signal read from an unattached pin.
    pub fn empty() -> Self {
        Self { width: 0, bits: 0, floats: 0 }
    }

    /// All bits driven low.
    pub fn zero(width: u32) -> Self {
        assert!(width <= MAX_WIDTH, "signal width {} out of range", width);
        Self { width: width as u8, bits: 0, floats: 0 }
    }

    /// The fully-floating marker of the given width.
    pub fn floating(width: u32) -> Self {
        assert!(width <= MAX_WIDTH, "signal width {} out of range", width);
        Self { width: width as u8, bits: 0, floats: mask(width) }
    }

    /// Driven value from an integer, truncated to the width.
    pub fn from_u64(width: u32, bits: u64) -> Self {
        assert!(width <= MAX_WIDTH, "signal width {} out of range", width);
        Self { width: width as u8, bits: bits & mask(width), floats: 0 }
    }

    /// A single driven bit.
    pub fn from_bool(level: bool) -> Self {
        Self::from_u64(1, level as u64)
    }

    pub fn width(&self) -> u32 {
        self.width as u32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0
    }

    /// True when every bit floats. The width-0 signal is not floating.
    pub fn is_floating(&self) -> bool {
        self.width > 0 && self.floats == mask(self.width())
    }

    /// True when at least one bit floats.
    pub fn has_floating(&self) -> bool {
        self.floats != 0
    }

    pub fn bit(&self, index: u32) -> Bit {
        assert!(index < self.width(), "bit index {} out of width {}", index, self.width);
        if self.floats >> index & 1 == 1 {
            Bit::Floating
        } else if self.bits >> index & 1 == 1 {
            Bit::One
        } else {
            Bit::Zero
        }
    }

    pub fn set_bit(mut self, index: u32, level: Bit) -> Self {
        assert!(index < self.width(), "bit index {} out of width {}", index, self.width);
        let m = 1u64 << index;
        self.bits &= !m;
        self.floats &= !m;
        match level {
            Bit::Zero => {}
            Bit::One => self.bits |= m,
            Bit::Floating => self.floats |= m,
        }
        self
    }

    /// Extract `width` bits starting at `lo` (the splitter operation).
    pub fn slice(&self, lo: u32, width: u32) -> Self {
        assert!(
            lo + width <= self.width(),
            "slice {}..{} out of width {}",
            lo,
            lo + width,
            self.width
        );
        if width == 0 {
            return Self::empty();
        }
        // lo < 64 here since lo + width <= 64 and width >= 1
        Self {
            width: width as u8,
            bits: (self.bits >> lo) & mask(width),
            floats: (self.floats >> lo) & mask(width),
        }
    }

    /// Append `high` above this signal's bits (the binder operation).
    pub fn concat(&self, high: Signal) -> Self {
        let total = self.width() + high.width();
        assert!(total <= MAX_WIDTH, "concatenated width {} out of range", total);
        if high.width() == 0 {
            return *self;
        }
        // self.width() < 64 here since the total fits and high is non-empty
        Self {
            width: total as u8,
            bits: self.bits | (high.bits << self.width()),
            floats: self.floats | (high.floats << self.width()),
        }
    }

    /// Widen with driven-zero bits above the current width.
    pub fn extend_zero(&self, width: u32) -> Self {
        assert!(width >= self.width(), "extension narrows {} to {}", self.width, width);
        assert!(width <= MAX_WIDTH, "signal width {} out of range", width);
        Self { width: width as u8, bits: self.bits, floats: self.floats }
    }

    /// Widen with floating bits above the current width.
    pub fn extend_floating(&self, width: u32) -> Self {
        assert!(width >= self.width(), "extension narrows {} to {}", self.width, width);
        assert!(width <= MAX_WIDTH, "signal width {} out of range", width);
        let added = mask(width) & !mask(self.width());
        Self { width: width as u8, bits: self.bits, floats: self.floats | added }
    }

    /// Bitwise complement of the driven bits. Floating bits stay floating.
    pub fn not(&self) -> Self {
        Self {
            width: self.width,
            bits: !self.bits & mask(self.width()) & !self.floats,
            floats: self.floats,
        }
    }

    /// Integer value, `None` when any bit floats.
    pub fn to_u64(&self) -> Option<u64> {
        if self.floats == 0 {
            Some(self.bits)
        } else {
            None
        }
    }

    /// Integer value with floating bits read as zero. This is the reading
    /// discipline elements apply to their inputs: an undriven level
    /// evaluates as logic low, never as an error.
    pub fn as_u64_lossy(&self) -> u64 {
        self.bits
    }

    /// Normalize to a driven value of the given width: floating bits
    /// become zero, missing high bits are driven low, excess bits are
    /// truncated. Reading an unattached (width-0) pin through this
    /// yields all-zero of the requested width.
    pub fn well_defined(&self, width: u32) -> Self {
        Self::from_u64(width, self.bits)
    }

    /// Width-preserving add. Both operands must share this signal's
    /// width; floating bits count as zero. Returns the sum and the
    /// carry out of the top bit.
    pub fn add(&self, other: Signal, carry_in: bool) -> (Self, bool) {
        assert_eq!(
            self.width, other.width,
            "adding signals of widths {} and {}",
            self.width, other.width
        );
        let total = self.bits as u128 + other.bits as u128 + carry_in as u128;
        let sum = Self::from_u64(self.width(), total as u64);
        let carry = (total >> self.width()) & 1 == 1;
        (sum, carry)
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}'b", self.width)?;
        for i in (0..self.width()).rev() {
            match self.bit(i) {
                Bit::Zero => write!(f, "0")?,
                Bit::One => write!(f, "1")?,
                Bit::Floating => write!(f, "x")?,
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signal({})", self)
    }
}
