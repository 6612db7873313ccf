//! Tests for master loading, space conversion and histogram matching

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgb, RgbImage};
    use photomosaic::MosaicError;
    use photomosaic::colour::palette::Palette;
    use photomosaic::colour::space::ColourSpace;
    use photomosaic::mosaic::master::Master;
    use photomosaic::spatial::buffer::PixelBuffer;

    fn gradient(width: u32, height: u32) -> Master {
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
        });
        Master::from_image(&DynamicImage::ImageRgb8(image)).expect("ingests")
    }

    // Tests a decoded master keeps its dimensions and starts in RGB
    // Verified by transposing the buffer on ingestion
    #[test]
    fn test_from_image_dimensions() {
        let master = gradient(40, 30);
        assert_eq!(master.width(), 40);
        assert_eq!(master.height(), 30);
        assert_eq!(master.space(), ColourSpace::Rgb);
    }

    // Tests loading a missing file reports a decode error naming the path
    // Verified by mapping open failures to FileSystem errors
    #[test]
    fn test_from_file_missing() {
        match Master::from_file("does/not/exist.png") {
            Err(MosaicError::Decode { path, .. }) => {
                assert!(path.ends_with("exist.png"));
            }
            _ => unreachable!("Expected Decode error type"),
        }
    }

    // Tests loading round-trips through a PNG file
    // Verified by decoding with swapped channels
    #[test]
    fn test_from_file_round_trip() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("master.png");
        let image = RgbImage::from_fn(5, 4, |x, y| Rgb([x as u8, y as u8, 200]));
        image.save(&path).expect("write png");

        let master = Master::from_file(&path).expect("decodes");
        assert_eq!(master.pixels(), &PixelBuffer::from_rgb_image(&image).expect("ingests"));
    }

    // Tests conversions return new masters and reject re-entry
    // Verified by converting in place
    #[test]
    fn test_space_conversion() {
        let master = gradient(8, 8);
        let ucs = master.to_ucs().expect("converts");
        assert_eq!(master.space(), ColourSpace::Rgb);
        assert_eq!(ucs.space(), ColourSpace::Ucs);
        assert!(matches!(
            ucs.to_ucs(),
            Err(MosaicError::InvalidConversion { .. })
        ));

        let back = ucs.to_rgb().expect("converts");
        for (a, b) in back.pixels().data().iter().zip(master.pixels().data()) {
            assert!((a - b).abs() <= 1.0);
        }
    }

    // Tests palette and CDFs cover every pixel
    // Verified by histogramming only the first row
    #[test]
    fn test_palette_and_cdfs() {
        let master = gradient(10, 6);
        assert_eq!(master.palette().total(1), 60);
        assert_eq!(master.cdfs().total(2), 60);
    }

    // Tests matching onto a uniform reference collapses every channel to it
    // Verified by leaving pixels untouched when the LUT differs
    #[test]
    fn test_match_histogram_to_uniform_reference() {
        let master = gradient(16, 16);
        let reference = Palette::from_buffer(&PixelBuffer::filled(
            4,
            4,
            [30.0, 60.0, 90.0],
            ColourSpace::Rgb,
        ));
        let matched = master.match_histogram(&reference).expect("same space");

        assert_eq!(matched.space(), ColourSpace::Rgb);
        for lane in matched.pixels().data().rows() {
            for (value, expected) in lane.iter().zip([30.0, 60.0, 90.0]) {
                assert!((value - expected).abs() < 1e-9, "{value} != {expected}");
            }
        }
        assert_ne!(matched, master);
    }

    // Tests matching onto the master's own palette leaves it unchanged
    // Verified by offsetting dequantised levels
    #[test]
    fn test_match_histogram_self_is_identity() {
        let master = gradient(12, 9);
        let matched = master.match_histogram(&master.palette()).expect("same space");
        for (a, b) in matched.pixels().data().iter().zip(master.pixels().data()) {
            assert!((a - b).abs() < 1e-9, "{a} != {b}");
        }
    }

    // Tests the reference must share the master's space
    // Verified by skipping the space check
    #[test]
    fn test_match_histogram_space_mismatch() {
        let master = gradient(4, 4);
        let reference = Palette::empty(ColourSpace::Ucs);
        assert!(matches!(
            master.match_histogram(&reference),
            Err(MosaicError::ColourSpaceMismatch { .. })
        ));
    }

    // Tests the master palette chart is written
    // Verified by writing the chart to the parent directory
    #[test]
    fn test_plot() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("charts").join("master.png");
        gradient(4, 4).plot(&path).expect("plot succeeds");
        assert!(path.exists());
    }
}
