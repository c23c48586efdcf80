//! SIO interpolator.
//!
//! Each core owns two interpolators. An interpolator holds two accumulators and three
//! base registers; every lane shifts, masks and optionally sign-extends its input, then
//! adds a base. Interpolator 0 additionally supports blend mode and interpolator 1 clamp
//! mode. Results are recomputed after every register write, so reads are side-effect
//! free except for the `POP` registers, which write results back into the accumulators.

const ACCUM0: u32 = 0x00;
const ACCUM1: u32 = 0x04;
const BASE0: u32 = 0x08;
const BASE1: u32 = 0x0C;
const BASE2: u32 = 0x10;
const POP_LANE0: u32 = 0x14;
const POP_LANE1: u32 = 0x18;
const POP_FULL: u32 = 0x1C;
const PEEK_LANE0: u32 = 0x20;
const PEEK_LANE1: u32 = 0x24;
const PEEK_FULL: u32 = 0x28;
const CTRL_LANE0: u32 = 0x2C;
const CTRL_LANE1: u32 = 0x30;
const ACCUM0_ADD: u32 = 0x34;
const ACCUM1_ADD: u32 = 0x38;
const BASE_1AND0: u32 = 0x3C;

/// Size of one interpolator's register block inside SIO.
pub const BLOCK_SIZE: u32 = 0x40;

/// Decoded lane control register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct LaneCtrl {
    shift: u32,
    mask_lsb: u32,
    mask_msb: u32,
    signed: bool,
    cross_input: bool,
    cross_result: bool,
    add_raw: bool,
    force_msb: u32,
    blend: bool,
    clamp: bool,
    overf0: bool,
    overf1: bool,
    overf: bool,
}

impl LaneCtrl {
    const fn from_bits(value: u32) -> Self {
        Self {
            shift: value & 0x1F,
            mask_lsb: (value >> 5) & 0x1F,
            mask_msb: (value >> 10) & 0x1F,
            signed: value & (1 << 15) != 0,
            cross_input: value & (1 << 16) != 0,
            cross_result: value & (1 << 17) != 0,
            add_raw: value & (1 << 18) != 0,
            force_msb: (value >> 19) & 3,
            blend: value & (1 << 21) != 0,
            clamp: value & (1 << 22) != 0,
            overf0: value & (1 << 23) != 0,
            overf1: value & (1 << 24) != 0,
            overf: value & (1 << 25) != 0,
        }
    }

    fn to_bits(self) -> u32 {
        self.shift
            | self.mask_lsb << 5
            | self.mask_msb << 10
            | u32::from(self.signed) << 15
            | u32::from(self.cross_input) << 16
            | u32::from(self.cross_result) << 17
            | u32::from(self.add_raw) << 18
            | self.force_msb << 19
            | u32::from(self.blend) << 21
            | u32::from(self.clamp) << 22
            | u32::from(self.overf0) << 23
            | u32::from(self.overf1) << 24
            | u32::from(self.overf) << 25
    }

    /// Mask with bits `mask_msb..=0` set.
    const fn msb_mask(self) -> u32 {
        if self.mask_msb == 31 { u32::MAX } else { (1 << (self.mask_msb + 1)) - 1 }
    }

    const fn mask(self) -> u32 {
        self.msb_mask() & !((1 << self.mask_lsb) - 1)
    }

    /// Shifted, masked and optionally sign-extended lane result, plus the overflow flag.
    const fn lane(self, input: u32) -> (u32, bool) {
        let shifted = input >> self.shift;
        let unsigned = shifted & self.mask();
        let overflow = shifted & !self.msb_mask() != 0;
        let result = if self.signed && unsigned & (1 << self.mask_msb) != 0 {
            unsigned | (u32::MAX << self.mask_msb)
        } else {
            unsigned
        };
        (result, overflow)
    }
}

/// One interpolator.
#[derive(Clone, Debug)]
pub struct Interpolator {
    index: usize,
    accum: [u32; 2],
    base: [u32; 3],
    ctrl: [u32; 2],
    result: [u32; 3],
    smresult: [u32; 2],
}

impl Interpolator {
    /// Creates interpolator `index` (0 or 1) in its reset state.
    pub fn new(index: usize) -> Self {
        let mut interp = Self {
            index,
            accum: [0; 2],
            base: [0; 3],
            ctrl: [0; 2],
            result: [0; 3],
            smresult: [0; 2],
        };
        interp.update();
        interp
    }

    /// Lane and full results as `[lane0, lane1, full]`.
    pub const fn results(&self) -> [u32; 3] {
        self.result
    }

    /// Recomputes all results from the current register state.
    fn update(&mut self) {
        let mut ctrl0 = LaneCtrl::from_bits(self.ctrl[0]);
        let mut ctrl1 = LaneCtrl::from_bits(self.ctrl[1]);
        let do_clamp = ctrl0.clamp && self.index == 1;
        let do_blend = ctrl0.blend && self.index == 0;
        ctrl0.clamp = do_clamp;
        ctrl0.blend = do_blend;
        ctrl1.clamp = false;
        ctrl1.blend = false;
        ctrl1.overf0 = false;
        ctrl1.overf1 = false;
        ctrl1.overf = false;

        let input0 = if ctrl0.cross_input { self.accum[1] } else { self.accum[0] };
        let input1 = if ctrl1.cross_input { self.accum[0] } else { self.accum[1] };
        let (result0, overf0) = ctrl0.lane(input0);
        let (result1, overf1) = ctrl1.lane(input1);

        let [base0, base1, base2] = self.base;
        let add0 = base0.wrapping_add(if ctrl0.add_raw { input0 } else { result0 });
        let add1 = base1.wrapping_add(if ctrl1.add_raw { input1 } else { result1 });
        let add2 = base2
            .wrapping_add(result0)
            .wrapping_add(if do_blend { 0 } else { result1 });

        let clamp0 = if ctrl0.signed {
            clamp_between(result0 as i32, base0 as i32, base1 as i32) as u32
        } else {
            clamp_between(result0, base0, base1)
        };

        let alpha = i64::from(result1 & 0xFF);
        let (lo, hi) = if ctrl1.signed {
            (i64::from(base0 as i32), i64::from(base1 as i32))
        } else {
            (i64::from(base0), i64::from(base1))
        };
        let blend1 = (lo + (alpha * (hi - lo)).div_euclid(256)) as u32;

        self.smresult = [result0, result1];
        self.result[0] = if do_blend {
            result1 & 0xFF
        } else {
            (if do_clamp { clamp0 } else { add0 }) | ctrl0.force_msb << 28
        };
        self.result[1] = (if do_blend { blend1 } else { add1 }) | ctrl1.force_msb << 28;
        self.result[2] = add2;

        ctrl0.overf0 = overf0;
        ctrl0.overf1 = overf1;
        ctrl0.overf = overf0 || overf1;
        self.ctrl = [ctrl0.to_bits(), ctrl1.to_bits()];
    }

    /// Writes lane results back into the accumulators (a `POP` read).
    fn writeback(&mut self) {
        let ctrl0 = LaneCtrl::from_bits(self.ctrl[0]);
        let ctrl1 = LaneCtrl::from_bits(self.ctrl[1]);
        self.accum[0] = if ctrl0.cross_result { self.result[1] } else { self.result[0] };
        self.accum[1] = if ctrl1.cross_result { self.result[0] } else { self.result[1] };
        self.update();
    }

    /// Loads BASE0 and BASE1 from the two halves of a word, sign-extending per lane.
    fn set_base01(&mut self, value: u32) {
        let ctrl0 = LaneCtrl::from_bits(self.ctrl[0]);
        let ctrl1 = LaneCtrl::from_bits(self.ctrl[1]);
        let do_blend = ctrl0.blend && self.index == 0;
        let extend = |half: u32, signed: bool| {
            if signed { half as u16 as i16 as i32 as u32 } else { half & 0xFFFF }
        };
        self.base[0] = extend(value, if do_blend { ctrl1.signed } else { ctrl0.signed });
        self.base[1] = extend(value >> 16, ctrl1.signed);
        self.update();
    }

    /// Reads a register of this interpolator.
    pub fn read(&mut self, offset: u32) -> u32 {
        match offset {
            ACCUM0 => self.accum[0],
            ACCUM1 => self.accum[1],
            BASE0 => self.base[0],
            BASE1 => self.base[1],
            BASE2 => self.base[2],
            POP_LANE0 | POP_LANE1 | POP_FULL => {
                let value = self.result[((offset - POP_LANE0) >> 2) as usize];
                self.writeback();
                value
            }
            PEEK_LANE0 | PEEK_LANE1 | PEEK_FULL => {
                self.result[((offset - PEEK_LANE0) >> 2) as usize]
            }
            CTRL_LANE0 => self.ctrl[0],
            CTRL_LANE1 => self.ctrl[1],
            ACCUM0_ADD => self.smresult[0],
            ACCUM1_ADD => self.smresult[1],
            _ => 0,
        }
    }

    /// Writes a register of this interpolator.
    pub fn write(&mut self, offset: u32, value: u32) {
        match offset {
            ACCUM0 => self.accum[0] = value,
            ACCUM1 => self.accum[1] = value,
            BASE0 => self.base[0] = value,
            BASE1 => self.base[1] = value,
            BASE2 => self.base[2] = value,
            CTRL_LANE0 => self.ctrl[0] = value,
            CTRL_LANE1 => self.ctrl[1] = value,
            ACCUM0_ADD => self.accum[0] = self.accum[0].wrapping_add(value),
            ACCUM1_ADD => self.accum[1] = self.accum[1].wrapping_add(value),
            BASE_1AND0 => {
                self.set_base01(value);
                return;
            }
            _ => return,
        }
        self.update();
    }
}

/// `min(max(value, lo), hi)` without the ordering assertion of [`Ord::clamp`].
fn clamp_between<T: PartialOrd>(value: T, lo: T, hi: T) -> T {
    if value < lo {
        lo
    } else if value > hi {
        hi
    } else {
        value
    }
}
