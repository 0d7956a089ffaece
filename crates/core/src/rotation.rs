//! Sensor and board mounting orientations.
//!
//! Each orientation is a composition of roll, pitch and yaw in multiples
//! of 45°, applied as `Rz(yaw) · Ry(pitch) · Rx(roll)`. Numbering follows
//! the `AHRS_ORIENTATION` parameter convention so stored values map
//! directly.

use core::f32::consts::FRAC_1_SQRT_2;
use nalgebra::{Matrix3, Vector3};

/// Mounting orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Rotation {
    #[default]
    None = 0,
    Yaw45 = 1,
    Yaw90 = 2,
    Yaw135 = 3,
    Yaw180 = 4,
    Yaw225 = 5,
    Yaw270 = 6,
    Yaw315 = 7,
    Roll180 = 8,
    Roll180Yaw45 = 9,
    Roll180Yaw90 = 10,
    Roll180Yaw135 = 11,
    Pitch180 = 12,
    Roll180Yaw225 = 13,
    Roll180Yaw270 = 14,
    Roll180Yaw315 = 15,
    Roll90 = 16,
    Roll90Yaw45 = 17,
    Roll90Yaw90 = 18,
    Roll90Yaw135 = 19,
    Roll270 = 20,
    Roll270Yaw45 = 21,
    Roll270Yaw90 = 22,
    Roll270Yaw135 = 23,
    Pitch90 = 24,
    Pitch270 = 25,
    Pitch180Yaw90 = 26,
    Pitch180Yaw270 = 27,
}

impl Rotation {
    const ALL: [Rotation; 28] = [
        Rotation::None,
        Rotation::Yaw45,
        Rotation::Yaw90,
        Rotation::Yaw135,
        Rotation::Yaw180,
        Rotation::Yaw225,
        Rotation::Yaw270,
        Rotation::Yaw315,
        Rotation::Roll180,
        Rotation::Roll180Yaw45,
        Rotation::Roll180Yaw90,
        Rotation::Roll180Yaw135,
        Rotation::Pitch180,
        Rotation::Roll180Yaw225,
        Rotation::Roll180Yaw270,
        Rotation::Roll180Yaw315,
        Rotation::Roll90,
        Rotation::Roll90Yaw45,
        Rotation::Roll90Yaw90,
        Rotation::Roll90Yaw135,
        Rotation::Roll270,
        Rotation::Roll270Yaw45,
        Rotation::Roll270Yaw90,
        Rotation::Roll270Yaw135,
        Rotation::Pitch90,
        Rotation::Pitch270,
        Rotation::Pitch180Yaw90,
        Rotation::Pitch180Yaw270,
    ];

    /// Orientation for a stored parameter value.
    pub fn from_param(value: i32) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    /// `(roll, pitch, yaw)` in degrees.
    pub const fn euler_deg(self) -> (i16, i16, i16) {
        match self {
            Rotation::None => (0, 0, 0),
            Rotation::Yaw45 => (0, 0, 45),
            Rotation::Yaw90 => (0, 0, 90),
            Rotation::Yaw135 => (0, 0, 135),
            Rotation::Yaw180 => (0, 0, 180),
            Rotation::Yaw225 => (0, 0, 225),
            Rotation::Yaw270 => (0, 0, 270),
            Rotation::Yaw315 => (0, 0, 315),
            Rotation::Roll180 => (180, 0, 0),
            Rotation::Roll180Yaw45 => (180, 0, 45),
            Rotation::Roll180Yaw90 => (180, 0, 90),
            Rotation::Roll180Yaw135 => (180, 0, 135),
            Rotation::Pitch180 => (0, 180, 0),
            Rotation::Roll180Yaw225 => (180, 0, 225),
            Rotation::Roll180Yaw270 => (180, 0, 270),
            Rotation::Roll180Yaw315 => (180, 0, 315),
            Rotation::Roll90 => (90, 0, 0),
            Rotation::Roll90Yaw45 => (90, 0, 45),
            Rotation::Roll90Yaw90 => (90, 0, 90),
            Rotation::Roll90Yaw135 => (90, 0, 135),
            Rotation::Roll270 => (270, 0, 0),
            Rotation::Roll270Yaw45 => (270, 0, 45),
            Rotation::Roll270Yaw90 => (270, 0, 90),
            Rotation::Roll270Yaw135 => (270, 0, 135),
            Rotation::Pitch90 => (0, 90, 0),
            Rotation::Pitch270 => (0, 270, 0),
            Rotation::Pitch180Yaw90 => (0, 180, 90),
            Rotation::Pitch180Yaw270 => (0, 180, 270),
        }
    }

    /// Rotation matrix taking a vector from the mounted frame to the
    /// reference frame.
    pub fn matrix(self) -> Matrix3<f32> {
        let (roll, pitch, yaw) = self.euler_deg();
        let (sr, cr) = sin_cos_deg(roll);
        let (sp, cp) = sin_cos_deg(pitch);
        let (sy, cy) = sin_cos_deg(yaw);

        let rx = Matrix3::new(1.0, 0.0, 0.0, 0.0, cr, -sr, 0.0, sr, cr);
        let ry = Matrix3::new(cp, 0.0, sp, 0.0, 1.0, 0.0, -sp, 0.0, cp);
        let rz = Matrix3::new(cy, -sy, 0.0, sy, cy, 0.0, 0.0, 0.0, 1.0);
        rz * ry * rx
    }

    pub fn rotate(self, v: &Vector3<f32>) -> Vector3<f32> {
        if self == Rotation::None {
            return *v;
        }
        self.matrix() * v
    }

    /// Undo [`rotate`](Self::rotate).
    pub fn rotate_inverse(self, v: &Vector3<f32>) -> Vector3<f32> {
        if self == Rotation::None {
            return *v;
        }
        self.matrix().transpose() * v
    }
}

/// Exact sine and cosine for multiples of 45°.
fn sin_cos_deg(deg: i16) -> (f32, f32) {
    match deg.rem_euclid(360) {
        0 => (0.0, 1.0),
        45 => (FRAC_1_SQRT_2, FRAC_1_SQRT_2),
        90 => (1.0, 0.0),
        135 => (FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
        180 => (0.0, -1.0),
        225 => (-FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
        270 => (-1.0, 0.0),
        315 => (-FRAC_1_SQRT_2, FRAC_1_SQRT_2),
        other => {
            let rad = (other as f32).to_radians();
            (libm::sinf(rad), libm::cosf(rad))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn assert_vec_eq(a: Vector3<f32>, b: Vector3<f32>) {
        assert!((a - b).norm() < EPSILON, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_yaw_90_swaps_axes() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_vec_eq(Rotation::Yaw90.rotate(&v), Vector3::new(-2.0, 1.0, 3.0));
    }

    #[test]
    fn test_roll_180_flips_y_and_z() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_vec_eq(Rotation::Roll180.rotate(&v), Vector3::new(1.0, -2.0, -3.0));
    }

    #[test]
    fn test_roll_180_yaw_90_composes_roll_first() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_vec_eq(
            Rotation::Roll180Yaw90.rotate(&v),
            Vector3::new(2.0, 1.0, -3.0),
        );
    }

    #[test]
    fn test_pitch_180_yaw_90() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_vec_eq(
            Rotation::Pitch180Yaw90.rotate(&v),
            Vector3::new(-2.0, -1.0, -3.0),
        );
    }

    #[test]
    fn test_yaw_45_preserves_length() {
        let v = Vector3::new(1.0, 0.0, 0.0);
        let r = Rotation::Yaw45.rotate(&v);
        assert_vec_eq(r, Vector3::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2, 0.0));
        assert!((r.norm() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_inverse_undoes_every_rotation() {
        let v = Vector3::new(0.3, -1.2, 9.7);
        for rotation in Rotation::ALL {
            let back = rotation.rotate_inverse(&rotation.rotate(&v));
            assert!((back - v).norm() < 1e-5, "{:?}", rotation);
        }
    }

    #[test]
    fn test_from_param_maps_numbering() {
        assert_eq!(Rotation::from_param(0), Some(Rotation::None));
        assert_eq!(Rotation::from_param(8), Some(Rotation::Roll180));
        assert_eq!(Rotation::from_param(25), Some(Rotation::Pitch270));
        assert_eq!(Rotation::from_param(-1), None);
        assert_eq!(Rotation::from_param(100), None);
        for rotation in Rotation::ALL {
            assert_eq!(Rotation::from_param(rotation as i32), Some(rotation));
        }
    }
}
