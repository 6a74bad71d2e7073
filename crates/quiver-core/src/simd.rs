//! Distance kernels
//!
//! Explicit intrinsics for aarch64 (NEON, always available) and x86_64
//! (AVX2+FMA, detected at runtime), with a scalar fallback that LLVM
//! auto-vectorizes on other targets.
//!
//! | Platform     | Width            | Kernels                              |
//! |--------------|------------------|--------------------------------------|
//! | aarch64      | 128-bit (4×f32)  | `vfmaq_f32`, `vaddvq_f32`            |
//! | x86_64+AVX2  | 256-bit (8×f32)  | `_mm256_fmadd_ps`, `_mm256_sub_ps`   |
//! | other        | scalar           | iterator sum                         |

#[cfg(target_arch = "aarch64")]
mod neon {
    use std::arch::aarch64::*;

    #[inline(always)]
    pub unsafe fn dot(a: &[f32], b: &[f32]) -> f32 {
        let chunks = a.len() / 4;
        let mut acc = vdupq_n_f32(0.0);
        for i in 0..chunks {
            let va = vld1q_f32(a.as_ptr().add(i * 4));
            let vb = vld1q_f32(b.as_ptr().add(i * 4));
            acc = vfmaq_f32(acc, va, vb);
        }
        let mut sum = vaddvq_f32(acc);
        for i in chunks * 4..a.len() {
            sum += a[i] * b[i];
        }
        sum
    }

    #[inline(always)]
    pub unsafe fn l2_sq(a: &[f32], b: &[f32]) -> f32 {
        let chunks = a.len() / 4;
        let mut acc = vdupq_n_f32(0.0);
        for i in 0..chunks {
            let va = vld1q_f32(a.as_ptr().add(i * 4));
            let vb = vld1q_f32(b.as_ptr().add(i * 4));
            let diff = vsubq_f32(va, vb);
            acc = vfmaq_f32(acc, diff, diff);
        }
        let mut sum = vaddvq_f32(acc);
        for i in chunks * 4..a.len() {
            let d = a[i] - b[i];
            sum += d * d;
        }
        sum
    }
}

#[cfg(target_arch = "x86_64")]
mod avx2 {
    use std::arch::x86_64::*;

    /// Horizontal sum of the 8 lanes of `v`.
    #[target_feature(enable = "avx2,fma")]
    #[inline]
    unsafe fn hsum(v: __m256) -> f32 {
        let hi = _mm256_extractf128_ps(v, 1);
        let lo = _mm256_castps256_ps128(v);
        let sum128 = _mm_add_ps(lo, hi);
        let sums = _mm_add_ps(sum128, _mm_movehdup_ps(sum128));
        _mm_cvtss_f32(_mm_add_ss(sums, _mm_movehl_ps(sums, sums)))
    }

    #[target_feature(enable = "avx2,fma")]
    #[inline]
    pub unsafe fn dot(a: &[f32], b: &[f32]) -> f32 {
        let chunks = a.len() / 8;
        let mut acc = _mm256_setzero_ps();
        for i in 0..chunks {
            let va = _mm256_loadu_ps(a.as_ptr().add(i * 8));
            let vb = _mm256_loadu_ps(b.as_ptr().add(i * 8));
            acc = _mm256_fmadd_ps(va, vb, acc);
        }
        let mut sum = hsum(acc);
        for i in chunks * 8..a.len() {
            sum += a[i] * b[i];
        }
        sum
    }

    #[target_feature(enable = "avx2,fma")]
    #[inline]
    pub unsafe fn l2_sq(a: &[f32], b: &[f32]) -> f32 {
        let chunks = a.len() / 8;
        let mut acc = _mm256_setzero_ps();
        for i in 0..chunks {
            let va = _mm256_loadu_ps(a.as_ptr().add(i * 8));
            let vb = _mm256_loadu_ps(b.as_ptr().add(i * 8));
            let diff = _mm256_sub_ps(va, vb);
            acc = _mm256_fmadd_ps(diff, diff, acc);
        }
        let mut sum = hsum(acc);
        for i in chunks * 8..a.len() {
            let d = a[i] - b[i];
            sum += d * d;
        }
        sum
    }
}

#[inline(always)]
fn dot_product_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline(always)]
fn l2_distance_squared_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Dot product of two equal-length vectors.
///
/// # Panics
///
/// If `a` and `b` differ in length; the vector kernels read `a.len()`
/// elements from both.
#[inline(always)]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector length mismatch");

    #[cfg(target_arch = "aarch64")]
    {
        return unsafe { neon::dot(a, b) };
    }

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return unsafe { avx2::dot(a, b) };
        }
    }

    #[allow(unreachable_code)]
    dot_product_scalar(a, b)
}

/// Squared Euclidean distance ||a - b||² (no square root).
///
/// # Panics
///
/// If `a` and `b` differ in length.
#[inline(always)]
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector length mismatch");

    #[cfg(target_arch = "aarch64")]
    {
        return unsafe { neon::l2_sq(a, b) };
    }

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return unsafe { avx2::l2_sq(a, b) };
        }
    }

    #[allow(unreachable_code)]
    l2_distance_squared_scalar(a, b)
}

/// Write `a - b` into `out` (used for IVF-PQ residuals).
#[inline]
pub fn subtract_into(a: &[f32], b: &[f32], out: &mut [f32]) {
    debug_assert!(a.len() == b.len() && a.len() == out.len());
    for ((o, x), y) in out.iter_mut().zip(a).zip(b) {
        *o = x - y;
    }
}

/// L2-normalize a vector in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = dot_product(v, v).sqrt();
    if norm > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// L2-normalized copy of `v`.
pub fn l2_normalized(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    l2_normalize(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_product_basic() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [5.0, 6.0, 7.0, 8.0];
        // 5 + 12 + 21 + 32
        assert!((dot_product(&a, &b) - 70.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_distance_squared_basic() {
        let a = [0.0, 0.0, 0.0];
        let b = [3.0, 4.0, 0.0];
        assert!((l2_distance_squared(&a, &b) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_kernels_match_scalar_with_tail() {
        // 37 exercises both the vector body and the remainder loop
        let a: Vec<f32> = (0..37).map(|i| (i as f32 * 0.37).sin()).collect();
        let b: Vec<f32> = (0..37).map(|i| (i as f32 * 0.11).cos()).collect();

        assert!((dot_product(&a, &b) - dot_product_scalar(&a, &b)).abs() < 1e-4);
        assert!((l2_distance_squared(&a, &b) - l2_distance_squared_scalar(&a, &b)).abs() < 1e-4);
    }

    #[test]
    fn test_single_element() {
        assert!((dot_product(&[3.0], &[4.0]) - 12.0).abs() < 1e-6);
        assert!((l2_distance_squared(&[3.0], &[4.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "Vector length mismatch")]
    fn test_dot_product_rejects_length_mismatch() {
        dot_product(&[1.0; 16], &[1.0; 8]);
    }

    #[test]
    #[should_panic(expected = "Vector length mismatch")]
    fn test_l2_rejects_length_mismatch() {
        l2_distance_squared(&[1.0; 8], &[1.0; 16]);
    }

    #[test]
    fn test_subtract_into() {
        let mut out = [0.0f32; 3];
        subtract_into(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0], &mut out);
        assert_eq!(out, [4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let v = l2_normalized(&[0.0f32; 64]);
        assert!(v.iter().all(|&x| x == 0.0), "Zero vector should remain zero");
    }
}
