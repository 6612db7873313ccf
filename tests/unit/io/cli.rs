//! Tests for command-line interface parsing and build orchestration

#[cfg(test)]
mod tests {
    use clap::Parser;
    use image::{Rgb, RgbImage};
    use photomosaic::MosaicError;
    use photomosaic::colour::space::ColourSpace;
    use photomosaic::io::cli::{Cli, MosaicRunner};
    use photomosaic::io::configuration::{DEFAULT_MAX_REPEATS, DEFAULT_METRIC, DEFAULT_TILE_SIDE};
    use photomosaic::metrics::registry::MetricRegistry;
    use photomosaic::spatial::cell::TileSize;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
        let master = dir.join("master.png");
        RgbImage::from_fn(16, 12, |x, _| {
            if x < 8 {
                Rgb([20, 20, 20])
            } else {
                Rgb([230, 230, 230])
            }
        })
        .save(&master)
        .expect("write master");

        let tiles = dir.join("tiles");
        std::fs::create_dir(&tiles).expect("create tile dir");
        RgbImage::from_pixel(6, 6, Rgb([0, 0, 0]))
            .save(tiles.join("dark.png"))
            .expect("write tile");
        RgbImage::from_pixel(5, 9, Rgb([255, 255, 255]))
            .save(tiles.join("light.png"))
            .expect("write tile");
        (master, tiles)
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("program").chain(args.iter().copied()))
    }

    fn parse_with_inputs(master: &Path, tiles: &Path, extra: &[&str]) -> Cli {
        let inputs = [master, tiles].map(|p| p.to_string_lossy().to_string());
        let mut args: Vec<&str> = inputs.iter().map(String::as_str).collect();
        args.extend_from_slice(extra);
        parse(&args)
    }

    // Tests CLI parsing with only the required arguments
    // Verified by changing default values to ensure defaults are used
    #[test]
    fn test_cli_parse_minimal_args() {
        let cli = parse(&["master.png", "tiles"]);

        assert_eq!(cli.master, PathBuf::from("master.png"));
        assert_eq!(cli.tiles, PathBuf::from("tiles"));
        assert_eq!(cli.metric, DEFAULT_METRIC);
        assert_eq!(cli.tile_size, TileSize::square(DEFAULT_TILE_SIDE));
        assert_eq!(cli.max_repeats, DEFAULT_MAX_REPEATS);
        assert_eq!(cli.colour_space, ColourSpace::Rgb);
        assert!(!cli.match_histogram);
        assert!(!cli.visualize);
        assert!(cli.should_show_progress());
    }

    // Tests CLI parsing with all available arguments
    // Verified by modifying custom parsers to ensure they're invoked
    #[test]
    fn test_cli_parse_all_args() {
        let cli = parse(&[
            "master.png",
            "tiles",
            "--output",
            "out.jpg",
            "--metric",
            "greyscale",
            "--tile-size",
            "16x8",
            "--max-repeats",
            "3",
            "--colour-space",
            "ucs",
            "--match-histogram",
            "--plot-palette",
            "palette.png",
            "--visualize",
            "--quiet",
        ]);

        assert_eq!(cli.output, Some(PathBuf::from("out.jpg")));
        assert_eq!(cli.metric, "greyscale");
        assert_eq!(cli.tile_size, TileSize::new(16, 8));
        assert_eq!(cli.max_repeats, 3);
        assert_eq!(cli.colour_space, ColourSpace::Ucs);
        assert!(cli.match_histogram);
        assert_eq!(cli.plot_palette, Some(PathBuf::from("palette.png")));
        assert!(cli.visualize);
        assert!(!cli.should_show_progress());

        let config = cli.config();
        assert_eq!(config.metric, "greyscale");
        assert_eq!(config.tile_size, TileSize::new(16, 8));
        assert!(config.match_histogram);
    }

    // Tests invalid tile sizes and colour spaces are rejected at parse time
    // Verified by deferring tile size validation
    #[test]
    fn test_cli_rejects_bad_values() {
        let argv = |extra: [&'static str; 2]| ["program", "m.png", "t", extra[0], extra[1]];
        assert!(Cli::try_parse_from(argv(["--tile-size", "0"])).is_err());
        assert!(Cli::try_parse_from(argv(["--colour-space", "hsv"])).is_err());
        assert!(Cli::try_parse_from(argv(["--max-repeats", "-1"])).is_err());
    }

    // Tests output paths default next to the master
    // Verified by dropping the suffix from the default name
    #[test]
    fn test_output_paths() {
        let cli = parse(&["photos/cat.jpg", "tiles"]);
        assert_eq!(cli.output_path(), PathBuf::from("photos/cat_mosaic.jpg"));
        assert_eq!(
            cli.visualization_path(),
            PathBuf::from("photos/cat_mosaic_build.gif")
        );

        let cli = parse(&["cat", "tiles", "-o", "result.png"]);
        assert_eq!(cli.output_path(), PathBuf::from("result.png"));
        assert_eq!(cli.visualization_path(), PathBuf::from("result_build.gif"));
    }

    // Tests a full run writes the mosaic, chart and animation
    // Verified by skipping the animation export
    #[test]
    fn test_runner_writes_outputs() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let (master, tiles) = write_inputs(temp_dir.path());
        let output = temp_dir.path().join("out").join("mosaic.png");
        let chart = temp_dir.path().join("palette.png");

        let output_arg = output.to_string_lossy();
        let chart_arg = chart.to_string_lossy();
        let cli = parse_with_inputs(
            &master,
            &tiles,
            &[
                "--output",
                &output_arg,
                "--tile-size",
                "4",
                "--plot-palette",
                &chart_arg,
                "--visualize",
                "--quiet",
            ],
        );
        let visualization = cli.visualization_path();
        let written = MosaicRunner::new(cli).process().expect("build succeeds");

        assert_eq!(written, output);
        let mosaic = image::open(&output).expect("decodes").to_rgb8();
        assert_eq!(mosaic.dimensions(), (16, 12));
        assert_eq!(mosaic.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(mosaic.get_pixel(15, 11), &Rgb([255, 255, 255]));
        assert!(chart.exists());
        assert!(visualization.exists());
    }

    // Tests a UCS run with histogram matching completes
    // Verified by converting only the master to UCS
    #[test]
    fn test_runner_ucs_with_histogram_matching() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let (master, tiles) = write_inputs(temp_dir.path());
        let output = temp_dir.path().join("ucs.png");

        let output_arg = output.to_string_lossy();
        let cli = parse_with_inputs(
            &master,
            &tiles,
            &[
                "-o",
                &output_arg,
                "-t",
                "4",
                "-c",
                "ucs",
                "--match-histogram",
                "-q",
            ],
        );
        MosaicRunner::new(cli).process().expect("build succeeds");
        assert!(output.exists());
    }

    // Tests unknown metrics fail before any work is done
    // Verified by falling back to the default metric
    #[test]
    fn test_runner_unknown_metric() {
        let cli = parse(&["missing.png", "tiles", "--metric", "cosine", "--quiet"]);
        match MosaicRunner::new(cli).process() {
            Err(MosaicError::UnknownMetric { name }) => assert_eq!(name, "cosine"),
            _ => unreachable!("Expected UnknownMetric error type"),
        }
    }

    // Tests custom registries resolve their own metric names
    // Verified by always resolving against the built-in registry
    #[test]
    fn test_runner_custom_registry() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let (master, tiles) = write_inputs(temp_dir.path());
        let output = temp_dir.path().join("custom.png");

        let mut registry = MetricRegistry::with_builtins();
        registry.register_fn(
            "first",
            |_: ndarray::ArrayView3<'_, f64>, _: ndarray::ArrayView3<'_, f64>| 0.0,
        );
        let output_arg = output.to_string_lossy();
        let cli = parse_with_inputs(
            &master,
            &tiles,
            &["-o", &output_arg, "-t", "4", "-m", "first", "-q"],
        );
        MosaicRunner::with_registry(cli, registry)
            .process()
            .expect("build succeeds");

        // Every distance ties, so the first tile (dark.png) fills the mosaic
        let mosaic = image::open(&output).expect("decodes").to_rgb8();
        assert!(mosaic.pixels().all(|p| p == &Rgb([0, 0, 0])));
    }

    // Tests an exhausted pool surfaces with its exit code
    // Verified by ignoring max_repeats in the runner
    #[test]
    fn test_runner_exhausted_pool() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let (master, tiles) = write_inputs(temp_dir.path());

        let cli = parse_with_inputs(&master, &tiles, &["-t", "4", "-r", "1", "-q"]);
        let error = MosaicRunner::new(cli).process().expect_err("12 cells, 2 tiles");
        assert!(matches!(error, MosaicError::EmptyPool { cell: Some(_), .. }));
        assert_eq!(error.exit_code(), 7);
    }
}
