//! Property-Based Tests for the quantization codec
//!
//! Fuzzes the codec invariants across the input space: saturation bounds,
//! zero-safety, round-trip error, and identity-transfer exactness.
//!
//! Run: cargo test --test quantize_proptest

use proptest::prelude::*;

use escalar::quantize::{
    copy_from, copy_into, dequantize_into, dynamic_range_scale, quantize_into,
};

// ============================================================================
// Bounds and zero-safety
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn test_quantized_values_within_type_limits(
        values in prop::collection::vec(-1e6f32..1e6f32, 1..64)
    ) {
        let mut device = vec![0i8; values.len()];
        quantize_into(&values, &mut device);
        // i8 covers all of [-128, 127], but the codec clamps to the
        // symmetric [-127, 127] range implied by scaling to MAX_LIMIT.
        prop_assert!(device.iter().all(|&q| (-127..=127).contains(&q)));
    }

    #[test]
    fn test_quantized_i16_within_type_limits(
        values in prop::collection::vec(-1e12f64..1e12f64, 1..64)
    ) {
        let mut device = vec![0i16; values.len()];
        quantize_into(&values, &mut device);
        prop_assert!(device.iter().all(|&q| (-32767..=32767).contains(&q)));
    }

    #[test]
    fn test_scale_is_max_abs_or_one(
        values in prop::collection::vec(-1e6f32..1e6f32, 1..64)
    ) {
        let scale = dynamic_range_scale(&values);
        let max_abs = values.iter().map(|v| v.abs() as f64).fold(0.0f64, f64::max);
        if max_abs == 0.0 {
            prop_assert_eq!(scale, 1.0);
        } else {
            prop_assert_eq!(scale, max_abs);
        }
        prop_assert!(scale > 0.0);
    }

    #[test]
    fn test_zero_tensor_never_faults(len in 1usize..64) {
        let values = vec![0.0f32; len];
        let mut device = vec![0i8; len];
        let scale = quantize_into(&values, &mut device);
        prop_assert_eq!(scale, 1.0);
        prop_assert!(device.iter().all(|&q| q == 0));
    }
}

// ============================================================================
// Round-trip error
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn test_roundtrip_error_bounded_by_half_step(
        values in prop::collection::vec(-100.0f32..100.0f32, 1..32)
    ) {
        let mut device = vec![0i8; values.len()];
        let raw_scale = quantize_into(&values, &mut device);
        let effective = raw_scale / 127.0;

        let mut back = vec![0.0f32; values.len()];
        dequantize_into(&device, &mut back, effective);

        // One quantization step is `effective`; rounding error is at most
        // half a step (plus f32 representation noise).
        for (orig, rt) in values.iter().zip(back.iter()) {
            let tol = 0.5 * effective as f32 + 1e-5;
            prop_assert!(
                (orig - rt).abs() <= tol,
                "value {} round-tripped to {} (tol {})",
                orig, rt, tol
            );
        }
    }

    #[test]
    fn test_identity_roundtrip_exact_i16(
        values in prop::collection::vec(i16::MIN..=i16::MAX, 1..32)
    ) {
        let mut device = vec![0i16; values.len()];
        copy_into(&values, &mut device);
        prop_assert_eq!(&device, &values);

        let mut back = vec![0i16; values.len()];
        copy_from(&device, &mut back);
        prop_assert_eq!(&back, &values);
    }

    #[test]
    fn test_identity_roundtrip_exact_f32(
        values in prop::collection::vec(prop::num::f32::NORMAL | prop::num::f32::ZERO, 1..32)
    ) {
        let mut device = vec![0.0f32; values.len()];
        copy_into(&values, &mut device);
        let mut back = vec![0.0f32; values.len()];
        copy_from(&device, &mut back);
        prop_assert_eq!(&back, &values);
    }
}

// ============================================================================
// Sign preservation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_quantization_preserves_sign(
        values in prop::collection::vec(-100.0f32..100.0f32, 1..32)
    ) {
        let mut device = vec![0i8; values.len()];
        quantize_into(&values, &mut device);
        for (v, &q) in values.iter().zip(device.iter()) {
            if q != 0 {
                prop_assert_eq!(v.signum() as i32, i32::from(q.signum()));
            }
        }
    }
}
