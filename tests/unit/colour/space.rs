//! Tests for colour-space tagging, quantisation and the RGB <-> UCS transforms

#[cfg(test)]
mod tests {
    use photomosaic::MosaicError;
    use photomosaic::colour::space::{
        ColourSpace, LEVELS, rgb_to_ucs, to_rgb, to_ucs, ucs_to_rgb,
    };
    use photomosaic::spatial::buffer::PixelBuffer;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    // Tests sRGB primaries land on their published L*a*b* coordinates
    // Verified by swapping the white point components
    #[test]
    fn test_rgb_to_ucs_reference_colours() {
        let white = rgb_to_ucs([255.0, 255.0, 255.0]);
        assert!((white[0] - 100.0).abs() < 0.01, "white L* = {}", white[0]);
        assert!(white[1].abs() < 0.01 && white[2].abs() < 0.01);

        let black = rgb_to_ucs([0.0, 0.0, 0.0]);
        assert!(black.iter().all(|v| v.abs() < 1e-9));

        let red = rgb_to_ucs([255.0, 0.0, 0.0]);
        assert!((red[0] - 53.24).abs() < 0.1, "red L* = {}", red[0]);
        assert!((red[1] - 80.09).abs() < 0.2, "red a* = {}", red[1]);
        assert!((red[2] - 67.20).abs() < 0.2, "red b* = {}", red[2]);
    }

    // Tests random pixels survive RGB -> UCS -> RGB within one level
    // Verified by dropping the gamma step from the inverse transform
    #[test]
    fn test_round_trip_within_one_level() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            let rgb = [0, 1, 2].map(|_| f64::from(rng.random_range(0u8..=255)));
            let back = ucs_to_rgb(rgb_to_ucs(rgb));
            for (a, b) in rgb.iter().zip(back) {
                assert!((a - b).abs() <= 1.0, "{rgb:?} came back as {back:?}");
            }
        }
    }

    // Tests buffer conversion retags the space and rejects re-entry
    // Verified by removing the same-space guard
    #[test]
    fn test_buffer_conversion_rejects_same_space() {
        let rgb = PixelBuffer::filled(2, 3, [10.0, 200.0, 30.0], ColourSpace::Rgb);
        let ucs = to_ucs(&rgb).expect("rgb converts to ucs");
        assert_eq!(ucs.space(), ColourSpace::Ucs);
        assert_eq!(ucs.shape(), rgb.shape());

        assert!(matches!(
            to_ucs(&ucs),
            Err(MosaicError::InvalidConversion {
                from: ColourSpace::Ucs,
                to: ColourSpace::Ucs
            })
        ));
        assert!(matches!(
            to_rgb(&rgb),
            Err(MosaicError::InvalidConversion { .. })
        ));

        let back = to_rgb(&ucs).expect("ucs converts to rgb");
        for (a, b) in back.data().iter().zip(rgb.data()) {
            assert!((a - b).abs() <= 1.0);
        }
    }

    // Tests quantisation covers the full level range and clamps outliers
    // Verified by removing the clamp
    #[test]
    fn test_quantize_bounds() {
        let rgb = ColourSpace::Rgb;
        assert_eq!(rgb.quantize(0, 0.0), 0);
        assert_eq!(rgb.quantize(0, 255.0), LEVELS - 1);
        assert_eq!(rgb.quantize(1, 300.0), LEVELS - 1);
        assert_eq!(rgb.quantize(2, -5.0), 0);
        assert_eq!(rgb.quantize(0, f64::NAN), 0);

        let ucs = ColourSpace::Ucs;
        assert_eq!(ucs.quantize(0, 100.0), LEVELS - 1);
        assert_eq!(ucs.quantize(1, -128.0), 0);
        assert_eq!(ucs.quantize(2, 128.0), LEVELS - 1);
    }

    // Tests dequantised levels quantise back to themselves
    // Verified by offsetting dequantize by half a level
    #[test]
    fn test_dequantize_inverts_quantize() {
        for space in [ColourSpace::Rgb, ColourSpace::Ucs] {
            for channel in 0..3 {
                for level in 0..LEVELS {
                    let value = space.dequantize(channel, level);
                    assert_eq!(space.quantize(channel, value), level);
                }
            }
        }
    }

    // Tests parsing and display of space names
    // Verified by making parsing case sensitive
    #[test]
    fn test_colour_space_parse_and_display() {
        assert_eq!("rgb".parse::<ColourSpace>().ok(), Some(ColourSpace::Rgb));
        assert_eq!("UCS".parse::<ColourSpace>().ok(), Some(ColourSpace::Ucs));
        assert!(matches!(
            "hsv".parse::<ColourSpace>(),
            Err(MosaicError::InvalidParameter { .. })
        ));
        assert_eq!(ColourSpace::Ucs.to_string(), "ucs");
        assert_eq!(ColourSpace::Rgb.other(), ColourSpace::Ucs);
        assert_eq!(ColourSpace::default(), ColourSpace::Rgb);
    }
}
