// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::f32::consts::{FRAC_1_SQRT_2, FRAC_PI_4};

/// Computes constant-power stereo gains for a volume and a pan position in `[-1, 1]`.
///
/// Returns `(left, right)`. Centre pan yields `volume * sqrt(1/2)` on both sides, hard left
/// yields `(volume, 0)`. Out-of-range pans are clamped; NaN is treated as centre.
pub fn stereo_volumes(volume: f32, pan: f32) -> (f32, f32) {
    let pan = if pan.is_nan() { 0.0 } else { pan.clamp(-1.0, 1.0) };
    let angle = pan * FRAC_PI_4;
    let (sin, cos) = angle.sin_cos();
    let left = (cos - sin) * FRAC_1_SQRT_2 * volume;
    let right = (cos + sin) * FRAC_1_SQRT_2 * volume;
    (left, right)
}
