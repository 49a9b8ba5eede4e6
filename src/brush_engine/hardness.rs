/// Keeps the soft edge finite when hardness is exactly 1.
const FALLOFF_EPSILON: f32 = 0.001;

/// Opacity multiplier at normalized distance `t` (0 = center, 1 = rim).
///
/// Full strength inside the `hardness` core, then a linear ramp to the rim.
#[inline]
pub fn falloff(t: f32, hardness: f32) -> f32 {
    if t <= hardness {
        1.0
    } else {
        1.0 - (t - hardness) / (1.0 - hardness + FALLOFF_EPSILON)
    }
}
