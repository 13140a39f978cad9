//! Table driven trigonometry on integers.
//!
//! Angles are degrees * 100. `sin` and `cos` return values scaled by
//! [`ONE`], so products can be brought back to the input scale with `>> 15`.

use crate::AngleHundredths;

/// 1.0 in the fixed point scale used by [`sin`] and [`cos`].
pub const ONE: i32 = 32768;

const SHIFT: u32 = 15;

// tan(deg) * 65536 for 0..=89 degrees, last entry stands in for ~89.9
const ATAN_TABLE: [i64; 91] = [
    0, 1144, 2289, 3435, 4583, 5734, 6889, 8047, 9211, 10380, // 0
    11556, 12739, 13931, 15131, 16340, 17561, 18793, 20037, 21294, 22566, // 10
    23854, 25157, 26479, 27819, 29179, 30560, 31965, 33393, 34847, 36328, // 20
    37838, 39379, 40952, 42560, 44205, 45889, 47615, 49385, 51203, 53071, // 30
    54992, 56970, 59009, 61114, 63288, 65536, 67865, 70279, 72786, 75391, // 40
    78103, 80931, 83883, 86970, 90203, 93596, 97162, 100917, 104880, 109071, // 50
    113512, 118231, 123256, 128622, 134369, 140543, 147197, 154394, 162208, 170728, // 60
    180059, 190331, 201700, 214359, 228552, 244584, 262851, 283868, 308323, 337154, // 70
    371674, 413779, 466313, 533748, 623534, 749080, 937209, 1250502, 1876706, 3754555, // 80
    37549324,
];

// sin(deg) * 32768 for 0..=90 degrees
const SIN_TABLE: [i32; 91] = [
    0, 572, 1144, 1715, 2286, 2856, 3425, 3993, 4560, 5126, // 0
    5690, 6252, 6813, 7371, 7927, 8481, 9032, 9580, 10126, 10668, // 10
    11207, 11743, 12275, 12803, 13328, 13848, 14365, 14876, 15384, 15886, // 20
    16384, 16877, 17364, 17847, 18324, 18795, 19261, 19720, 20174, 20622, // 30
    21063, 21498, 21926, 22348, 22763, 23170, 23571, 23965, 24351, 24730, // 40
    25102, 25466, 25822, 26170, 26510, 26842, 27166, 27482, 27789, 28088, // 50
    28378, 28660, 28932, 29197, 29452, 29698, 29935, 30163, 30382, 30592, // 60
    30792, 30983, 31164, 31336, 31499, 31651, 31795, 31928, 32052, 32166, // 70
    32270, 32365, 32449, 32524, 32588, 32643, 32688, 32723, 32748, 32763, // 80
    32768,
];

// sin and cos of 0.0..=0.9 degrees in tenths
const SIN_SMALL: [i32; 10] = [0, 57, 114, 172, 229, 286, 343, 400, 458, 515];
const COS_SMALL: [i32; 10] = [
    32768, 32768, 32768, 32768, 32767, 32767, 32766, 32766, 32765, 32764,
];

/// Interpolation steps above this would overflow `gap * 100` on a 32 bit target.
const COARSE_GAP: i64 = 21_474_836;

/// Inverse tangent of `y / x` in degrees * 100, in the range -18000..=18000.
///
/// Both inputs must lie in `-32768..=32768`, one raw sensor sample each.
pub fn atan2(y: i32, x: i32) -> AngleHundredths {
    assert!(
        (-32768..=32768).contains(&y),
        "atan2: y must be between -32768 and 32768: {y}"
    );
    assert!(
        (-32768..=32768).contains(&x),
        "atan2: x must be between -32768 and 32768: {x}"
    );

    if x == 0 {
        return match y {
            0 => 0,
            1.. => 9000,
            _ => -9000,
        };
    }

    let ratio = ((y as i64) << 16) / x as i64;
    let sign = if ratio < 0 { -1 } else { 1 };
    let ratio = ratio.abs();

    let magnitude = ATAN_TABLE
        .iter()
        .skip(1)
        .position(|&entry| ratio < entry)
        .map(|lower| {
            let span = ATAN_TABLE[lower + 1] - ATAN_TABLE[lower];
            let gap = ratio - ATAN_TABLE[lower];
            let fraction = if gap > COARSE_GAP {
                gap * 10 / span * 10
            } else {
                gap * 100 / span
            };
            lower as i32 * 100 + fraction as i32
        })
        .unwrap_or(9000);

    if x < 0 {
        sign * (magnitude - 18000)
    } else {
        sign * magnitude
    }
}

fn sin_deg(deg: i32) -> i32 {
    match deg {
        0..=90 => SIN_TABLE[deg as usize],
        91..=180 => SIN_TABLE[(180 - deg) as usize],
        -90..=-1 => -SIN_TABLE[-deg as usize],
        _ => -SIN_TABLE[(180 + deg) as usize],
    }
}

fn cos_deg(deg: i32) -> i32 {
    if deg >= 0 {
        sin_deg(90 - deg)
    } else {
        sin_deg(90 + deg)
    }
}

/// Sine of `angle` (degrees * 100), scaled by [`ONE`].
///
/// The angle is rounded to the nearest tenth of a degree and split into whole
/// degrees and a tenths remainder, then combined with
/// `sin(d + r) = sin(d)cos(r) + cos(d)sin(r)`. Negative angles shift the
/// negated sum, so a few sub-degree results are one unit away from the
/// mirrored positive value (`sin(3010) == 16433`, `sin(-3010) == -16434`).
///
/// # Panics
///
/// If `angle` is outside `-18000..=18000`.
pub fn sin(angle: AngleHundredths) -> i32 {
    assert!(
        (-18000..=18000).contains(&angle),
        "angle must be between -18000 and 18000: {angle}"
    );

    let tenths = (angle.abs() + 5) / 10;
    let remainder = (tenths % 10) as usize;
    let deg = tenths / 10;

    let sum = sin_deg(deg) * COS_SMALL[remainder] + cos_deg(deg) * SIN_SMALL[remainder];
    if angle < 0 {
        (-sum) >> SHIFT
    } else {
        sum >> SHIFT
    }
}

/// Cosine of `angle` (degrees * 100), scaled by [`ONE`].
pub fn cos(angle: AngleHundredths) -> i32 {
    if angle >= 0 {
        sin(9000 - angle)
    } else {
        sin(9000 + angle)
    }
}

/// Rotates `v` anticlockwise by `angle` (degrees * 100) in place.
///
/// The rotated components must fit in `i32`, which holds whenever both
/// inputs lie within `i32::MAX / 2` in magnitude. Larger results wrap.
pub fn rotate2d(angle: AngleHundredths, v: &mut [i32; 2]) {
    let c = cos(angle) as i64;
    let s = sin(angle) as i64;
    let [x, y] = v.map(i64::from);

    *v = [
        ((c * x - s * y) >> SHIFT) as i32,
        ((s * x + c * y) >> SHIFT) as i32,
    ];
}
