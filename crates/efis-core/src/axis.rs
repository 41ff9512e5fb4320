//! Declarative axis remapping shared by the accelerometer, gyroscope and
//! magnetometer vectors.
//!
//! Output axis `i` takes input axis `order[i]` and multiplies it by
//! `sign[i]`. The legacy board configuration (an optional Y/Z swap plus an
//! X/Y/Z inversion bitmask) maps onto this through
//! [`AxisTransform::from_legacy`]: the swap is applied first, and the
//! inversion bits then act on the output axes.

/// Sensor axis index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

/// Inversion bit for the X output axis.
pub const INVERT_X: u8 = 0b100;
/// Inversion bit for the Y output axis.
pub const INVERT_Y: u8 = 0b010;
/// Inversion bit for the Z output axis.
pub const INVERT_Z: u8 = 0b001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTransform {
    pub order: [Axis; 3],
    pub sign: [f32; 3],
}

impl AxisTransform {
    pub const IDENTITY: Self = Self {
        order: [Axis::X, Axis::Y, Axis::Z],
        sign: [1.0, 1.0, 1.0],
    };

    /// Builds the transform from a Y/Z swap flag and an `X_BIT|Y_BIT|Z_BIT`
    /// inversion mask.
    pub const fn from_legacy(swap_yz: bool, invert_mask: u8) -> Self {
        let order = if swap_yz {
            [Axis::X, Axis::Z, Axis::Y]
        } else {
            [Axis::X, Axis::Y, Axis::Z]
        };
        let sign = [
            if invert_mask & INVERT_X != 0 { -1.0 } else { 1.0 },
            if invert_mask & INVERT_Y != 0 { -1.0 } else { 1.0 },
            if invert_mask & INVERT_Z != 0 { -1.0 } else { 1.0 },
        ];
        Self { order, sign }
    }

    pub fn apply(&self, v: [f32; 3]) -> [f32; 3] {
        [
            self.sign[0] * v[self.order[0] as usize],
            self.sign[1] * v[self.order[1] as usize],
            self.sign[2] * v[self.order[2] as usize],
        ]
    }
}

impl Default for AxisTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Per-axis scale, fixed error offset and remap for one vector sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorCalibration {
    /// LSB per engineering unit
    pub scale: f32,
    /// Added after scaling, in engineering units
    pub offset: [f32; 3],
    pub transform: AxisTransform,
}

impl VectorCalibration {
    pub const fn new(scale: f32, transform: AxisTransform) -> Self {
        Self {
            scale,
            offset: [0.0; 3],
            transform,
        }
    }

    /// Raw counts to remapped engineering units.
    pub fn apply(&self, raw: [i16; 3]) -> [f32; 3] {
        let scaled = [
            raw[0] as f32 / self.scale + self.offset[0],
            raw[1] as f32 / self.scale + self.offset[1],
            raw[2] as f32 / self.scale + self.offset[2],
        ];
        self.transform.apply(scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_yz_with_z_inverted() {
        let t = AxisTransform::from_legacy(true, INVERT_Z);
        assert_eq!(t.apply([1.0, 2.0, 3.0]), [1.0, 3.0, -2.0]);
    }

    #[test]
    fn swap_yz_with_x_inverted() {
        let t = AxisTransform::from_legacy(true, INVERT_X);
        assert_eq!(t.apply([1.0, 2.0, 3.0]), [-1.0, 3.0, 2.0]);
    }

    #[test]
    fn no_swap_all_inverted() {
        let t = AxisTransform::from_legacy(false, INVERT_X | INVERT_Y | INVERT_Z);
        assert_eq!(t.apply([1.0, 2.0, 3.0]), [-1.0, -2.0, -3.0]);
    }

    #[test]
    fn identity_passes_through() {
        assert_eq!(AxisTransform::IDENTITY.apply([4.0, -5.0, 6.0]), [4.0, -5.0, 6.0]);
    }

    #[test]
    fn calibration_scales_offsets_then_remaps() {
        let mut cal = VectorCalibration::new(4096.0, AxisTransform::from_legacy(true, 0));
        cal.offset = [0.0, 0.5, 0.0];
        let out = cal.apply([4096, 8192, -4096]);
        assert_eq!(out, [1.0, -1.0, 2.5]);
    }
}
