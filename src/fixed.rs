// ap_fixed style fixed-point values: raw * 2^-(width - int_bits), defaults AP_TRN / AP_WRAP

use crate::error::PrecisionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How discarded fractional bits are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quantization {
    /// Truncate toward minus infinity (`AP_TRN`).
    #[default]
    Trn,
    /// Truncate toward zero (`AP_TRN_ZERO`).
    TrnZero,
    /// Round half toward plus infinity (`AP_RND`).
    Rnd,
    /// Round half toward zero (`AP_RND_ZERO`).
    RndZero,
    /// Round half toward minus infinity (`AP_RND_MIN_INF`).
    RndMinInf,
    /// Round half away from zero (`AP_RND_INF`).
    RndInf,
    /// Round half to even (`AP_RND_CONV`).
    RndConv,
}

impl Quantization {
    pub fn name(self) -> &'static str {
        match self {
            Quantization::Trn => "AP_TRN",
            Quantization::TrnZero => "AP_TRN_ZERO",
            Quantization::Rnd => "AP_RND",
            Quantization::RndZero => "AP_RND_ZERO",
            Quantization::RndMinInf => "AP_RND_MIN_INF",
            Quantization::RndInf => "AP_RND_INF",
            Quantization::RndConv => "AP_RND_CONV",
        }
    }

    /// Drops the low `shift` bits of `v` (shift > 0).
    fn shift_right(self, v: i128, shift: u32) -> i128 {
        // Anything shifted past 126 bits is below one ulp of every supported value.
        let d = shift.clamp(1, 126);
        let one = 1i128 << d;
        let half = one >> 1;
        match self {
            Quantization::Trn => v >> d,
            Quantization::TrnZero => if v < 0 { (v + one - 1) >> d } else { v >> d },
            Quantization::Rnd => (v + half) >> d,
            Quantization::RndZero => if v < 0 { (v + half) >> d } else { (v + half - 1) >> d },
            Quantization::RndMinInf => (v + half - 1) >> d,
            Quantization::RndInf => if v < 0 { (v + half - 1) >> d } else { (v + half) >> d },
            Quantization::RndConv => {
                let q = v >> d;
                let rem = v - (q << d);
                if rem > half || (rem == half && q & 1 == 1) { q + 1 } else { q }
            }
        }
    }

    /// Resolves a scaled real value to an integer.
    fn round_f64(self, s: f64) -> f64 {
        match self {
            Quantization::Trn => s.floor(),
            Quantization::TrnZero => s.trunc(),
            Quantization::Rnd => (s + 0.5).floor(),
            Quantization::RndZero => if s < 0.0 { (s + 0.5).floor() } else { (s - 0.5).ceil() },
            Quantization::RndMinInf => (s - 0.5).ceil(),
            Quantization::RndInf => s.round(),
            Quantization::RndConv => {
                let f = s.floor();
                let diff = s - f;
                if diff > 0.5 { f + 1.0 }
                else if diff < 0.5 { f }
                else if (f / 2.0).fract() == 0.0 { f }
                else { f + 1.0 }
            }
        }
    }
}

impl FromStr for Quantization {
    type Err = PrecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "AP_TRN" => Ok(Quantization::Trn),
            "AP_TRN_ZERO" => Ok(Quantization::TrnZero),
            "AP_RND" => Ok(Quantization::Rnd),
            "AP_RND_ZERO" => Ok(Quantization::RndZero),
            "AP_RND_MIN_INF" => Ok(Quantization::RndMinInf),
            "AP_RND_INF" => Ok(Quantization::RndInf),
            "AP_RND_CONV" => Ok(Quantization::RndConv),
            other => Err(PrecisionError::Quantization(other.to_string())),
        }
    }
}

/// How results outside the representable range are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Overflow {
    /// Keep the low `width` bits (`AP_WRAP`).
    #[default]
    Wrap,
    /// Clamp to the representable range (`AP_SAT`).
    Sat,
    /// Replace with zero (`AP_SAT_ZERO`).
    SatZero,
    /// Clamp to `[-max, max]` (`AP_SAT_SYM`).
    SatSym,
}

impl Overflow {
    pub fn name(self) -> &'static str {
        match self {
            Overflow::Wrap => "AP_WRAP",
            Overflow::Sat => "AP_SAT",
            Overflow::SatZero => "AP_SAT_ZERO",
            Overflow::SatSym => "AP_SAT_SYM",
        }
    }
}

impl FromStr for Overflow {
    type Err = PrecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "AP_WRAP" => Ok(Overflow::Wrap),
            "AP_SAT" => Ok(Overflow::Sat),
            "AP_SAT_ZERO" => Ok(Overflow::SatZero),
            "AP_SAT_SYM" => Ok(Overflow::SatSym),
            other => Err(PrecisionError::Overflow(other.to_string())),
        }
    }
}

/// Precision of a fixed-point type: total width, integer bits, signedness and the
/// quantization/overflow modes applied when a value is assigned to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FixedSpec {
    width: u32,
    int_bits: i32,
    signed: bool,
    quantization: Quantization,
    overflow: Overflow,
}

/// Compile-time `ap_fixed<width, int_bits>`; panics in const evaluation when out of range.
pub const fn ap_fixed(width: u32, int_bits: i32) -> FixedSpec {
    assert!(width > 0 && width <= FixedSpec::MAX_WIDTH, "ap_fixed width out of range");
    assert!(int_bits >= -32 && int_bits <= 64, "ap_fixed integer bits out of range");
    FixedSpec { width, int_bits, signed: true, quantization: Quantization::Trn, overflow: Overflow::Wrap }
}

impl FixedSpec {
    pub const MAX_WIDTH: u32 = 32;

    /// Signed `ap_fixed<width, int_bits>` with `AP_TRN`/`AP_WRAP`.
    pub fn new(width: u32, int_bits: i32) -> Result<Self, PrecisionError> {
        Self::build(width, int_bits, true)
    }

    /// Unsigned `ap_ufixed<width, int_bits>`.
    pub fn unsigned(width: u32, int_bits: i32) -> Result<Self, PrecisionError> {
        Self::build(width, int_bits, false)
    }

    /// Signed integer type (`ap_int<width>`).
    pub fn integer(width: u32) -> Result<Self, PrecisionError> {
        Self::build(width, width as i32, true)
    }

    fn build(width: u32, int_bits: i32, signed: bool) -> Result<Self, PrecisionError> {
        if width == 0 || width > Self::MAX_WIDTH { return Err(PrecisionError::Width(width)); }
        if !(-32..=64).contains(&int_bits) { return Err(PrecisionError::IntBits(int_bits)); }
        Ok(Self { width, int_bits, signed, quantization: Quantization::default(), overflow: Overflow::default() })
    }

    pub fn with_quantization(mut self, quantization: Quantization) -> Self {
        self.quantization = quantization;
        self
    }

    pub fn with_overflow(mut self, overflow: Overflow) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn int_bits(&self) -> i32 { self.int_bits }
    pub fn is_signed(&self) -> bool { self.signed }
    pub fn quantization(&self) -> Quantization { self.quantization }
    pub fn overflow(&self) -> Overflow { self.overflow }

    /// Number of bits right of the binary point; negative when `int_bits > width`.
    pub fn frac_bits(&self) -> i32 { self.width as i32 - self.int_bits }

    pub fn min_raw(&self) -> i64 {
        if self.signed { -(1i64 << (self.width - 1)) } else { 0 }
    }

    pub fn max_raw(&self) -> i64 {
        if self.signed { (1i64 << (self.width - 1)) - 1 } else { (1i64 << self.width) - 1 }
    }

    pub fn lsb(&self) -> f64 { 2f64.powi(-self.frac_bits()) }
    pub fn min_value(&self) -> f64 { self.raw_to_f64(self.min_raw()) }
    pub fn max_value(&self) -> f64 { self.raw_to_f64(self.max_raw()) }

    pub fn raw_to_f64(&self, raw: i64) -> f64 {
        raw as f64 * self.lsb()
    }

    /// Converts a real number to this precision.
    pub fn quantize(&self, x: f64) -> Result<Fixed, PrecisionError> {
        if !x.is_finite() { return Err(PrecisionError::NonFinite(x)); }
        let scaled = self.quantization.round_f64(x * 2f64.powi(self.frac_bits()));
        let raw = if scaled.abs() < 2f64.powi(100) {
            self.resolve_overflow(scaled as i128)
        } else {
            let congruent = scaled.rem_euclid(2f64.powi(self.width as i32)) as i128;
            self.out_of_range(scaled < 0.0, congruent)
        };
        Ok(Fixed { raw, spec: *self })
    }

    /// Requantizes `raw * 2^-frac` into this precision.
    pub fn cast_raw(&self, raw: i128, frac: i32) -> i64 {
        let target = self.frac_bits();
        if frac > target {
            let v = self.quantization.shift_right(raw, (frac - target) as u32);
            self.resolve_overflow(v)
        } else if frac < target {
            let shift = (target - frac) as u32;
            if raw == 0 { return 0; }
            if shift >= 127 || raw.unsigned_abs().leading_zeros() <= shift {
                // does not fit i128 after the shift, so it is out of range for any width
                let congruent = if shift >= self.width { 0 } else { raw.wrapping_shl(shift) };
                return self.out_of_range(raw < 0, congruent);
            }
            self.resolve_overflow(raw << shift)
        } else {
            self.resolve_overflow(raw)
        }
    }

    fn resolve_overflow(&self, v: i128) -> i64 {
        let lo = self.min_raw() as i128;
        let hi = self.max_raw() as i128;
        if self.overflow == Overflow::SatSym && self.signed {
            return v.clamp(-hi, hi) as i64;
        }
        if v >= lo && v <= hi { return v as i64; }
        self.out_of_range(v < 0, v)
    }

    /// `congruent` only needs to agree with the true value modulo `2^width`.
    fn out_of_range(&self, negative: bool, congruent: i128) -> i64 {
        match self.overflow {
            Overflow::Wrap => self.wrap(congruent),
            Overflow::Sat => if negative { self.min_raw() } else { self.max_raw() },
            Overflow::SatSym => match (negative, self.signed) {
                (true, true) => -self.max_raw(),
                (true, false) => 0,
                (false, _) => self.max_raw(),
            },
            Overflow::SatZero => 0,
        }
    }

    fn wrap(&self, v: i128) -> i64 {
        let modulus = 1i128 << self.width;
        let r = v.rem_euclid(modulus);
        if self.signed && r > self.max_raw() as i128 { (r - modulus) as i64 } else { r as i64 }
    }
}

impl fmt::Display for FixedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.signed { "ap_fixed" } else { "ap_ufixed" };
        write!(f, "{}<{},{}", name, self.width, self.int_bits)?;
        let custom_overflow = self.overflow != Overflow::default();
        if custom_overflow || self.quantization != Quantization::default() {
            write!(f, ",{}", self.quantization.name())?;
        }
        if custom_overflow {
            write!(f, ",{}", self.overflow.name())?;
        }
        write!(f, ">")
    }
}

impl FromStr for FixedSpec {
    type Err = PrecisionError;

    /// Accepts `ap_fixed<W,I[,Q[,O[,N]]]>`, `ap_ufixed<…>`, `ap_int<W>` and `ap_uint<W>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = || PrecisionError::Syntax(s.to_string());
        let (name, args) = s.trim()
            .strip_suffix('>')
            .and_then(|r| r.split_once('<'))
            .ok_or_else(syntax)?;
        let args: Vec<&str> = args.split(',').map(str::trim).collect();
        let width = |a: &str| a.parse::<u32>().map_err(|_| syntax());
        match name.trim() {
            "ap_fixed" | "ap_ufixed" => {
                if args.len() < 2 || args.len() > 5 { return Err(syntax()); }
                let w = width(args[0])?;
                let i = args[1].parse::<i32>().map_err(|_| syntax())?;
                let mut spec = if name.trim() == "ap_fixed" { Self::new(w, i)? } else { Self::unsigned(w, i)? };
                if let Some(q) = args.get(2) { spec = spec.with_quantization(q.parse()?); }
                if let Some(o) = args.get(3) { spec = spec.with_overflow(o.parse()?); }
                if let Some(n) = args.get(4) {
                    let n = n.parse::<u32>().map_err(|_| syntax())?;
                    if n != 0 { return Err(PrecisionError::SaturationBits(n)); }
                }
                Ok(spec)
            }
            "ap_int" | "ap_uint" => {
                if args.len() != 1 { return Err(syntax()); }
                let w = width(args[0])?;
                if name.trim() == "ap_int" { Self::integer(w) } else { Self::unsigned(w, w as i32) }
            }
            _ => Err(syntax()),
        }
    }
}

impl TryFrom<String> for FixedSpec {
    type Error = PrecisionError;
    fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<FixedSpec> for String {
    fn from(spec: FixedSpec) -> Self { spec.to_string() }
}

/// A single fixed-point value together with its precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fixed {
    raw: i64,
    spec: FixedSpec,
}

impl Fixed {
    pub fn zero(spec: FixedSpec) -> Self { Self { raw: 0, spec } }

    /// Interprets `raw` as an integer in units of the precision's lsb, resolving overflow.
    pub fn from_raw(spec: FixedSpec, raw: i64) -> Self {
        Self { raw: spec.cast_raw(raw as i128, spec.frac_bits()), spec }
    }

    pub fn raw(&self) -> i64 { self.raw }
    pub fn spec(&self) -> FixedSpec { self.spec }
    pub fn to_f64(&self) -> f64 { self.spec.raw_to_f64(self.raw) }

    /// Assignment to another precision.
    pub fn cast(self, spec: FixedSpec) -> Fixed {
        if spec == self.spec { return self; }
        Fixed { raw: spec.cast_raw(self.raw as i128, self.spec.frac_bits()), spec }
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

/// A homogeneous tensor of fixed-point values sharing one precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QTensor {
    spec: FixedSpec,
    raw: Vec<i64>,
}

impl QTensor {
    pub fn zeros(spec: FixedSpec, len: usize) -> Self {
        Self { spec, raw: vec![0; len] }
    }

    pub fn from_f64s(spec: FixedSpec, values: &[f64]) -> Result<Self, PrecisionError> {
        let raw = values.iter()
            .map(|&v| spec.quantize(v).map(|q| q.raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { spec, raw })
    }

    pub fn from_raw(spec: FixedSpec, raw: Vec<i64>) -> Self {
        let frac = spec.frac_bits();
        let raw = raw.into_iter().map(|r| spec.cast_raw(r as i128, frac)).collect();
        Self { spec, raw }
    }

    /// Collects values of any precision, casting each one to `spec`.
    pub fn from_fixed<I: IntoIterator<Item = Fixed>>(spec: FixedSpec, values: I) -> Self {
        let raw = values.into_iter().map(|v| v.cast(spec).raw).collect();
        Self { spec, raw }
    }

    pub fn spec(&self) -> FixedSpec { self.spec }
    pub fn raw(&self) -> &[i64] { &self.raw }
    pub fn len(&self) -> usize { self.raw.len() }
    pub fn is_empty(&self) -> bool { self.raw.is_empty() }

    pub fn get(&self, i: usize) -> Option<Fixed> {
        self.raw.get(i).map(|&raw| Fixed { raw, spec: self.spec })
    }

    pub fn iter(&self) -> impl Iterator<Item = Fixed> + '_ {
        let spec = self.spec;
        self.raw.iter().map(move |&raw| Fixed { raw, spec })
    }

    pub fn cast(&self, spec: FixedSpec) -> QTensor {
        if spec == self.spec { return self.clone(); }
        let frac = self.spec.frac_bits();
        let raw = self.raw.iter().map(|&r| spec.cast_raw(r as i128, frac)).collect();
        QTensor { spec, raw }
    }

    pub fn to_f64s(&self) -> Vec<f64> {
        self.raw.iter().map(|&r| self.spec.raw_to_f64(r)).collect()
    }
}
