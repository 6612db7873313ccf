//! Error types and context management for mosaic operations

use std::fmt;
use std::path::PathBuf;

use crate::colour::space::ColourSpace;

/// Main error type for all mosaic operations
#[derive(Debug)]
pub enum MosaicError {
    /// An image source could not be opened or decoded
    Decode {
        /// Path of the offending image source
        path: PathBuf,
        /// Underlying codec error
        source: image::ImageError,
    },

    /// A colour-space conversion was requested into the space the data is already in
    InvalidConversion {
        /// Space the data is tagged with
        from: ColourSpace,
        /// Requested target space
        to: ColourSpace,
    },

    /// Two operands that must share a shape do not
    ShapeMismatch {
        /// Shape of the left operand (height, width, channels)
        left: [usize; 3],
        /// Shape of the right operand (height, width, channels)
        right: [usize; 3],
    },

    /// Operands tagged with different colour spaces were combined
    ColourSpaceMismatch {
        /// Space required by the operation
        expected: ColourSpace,
        /// Space actually supplied
        found: ColourSpace,
    },

    /// No tile is eligible under the current reuse constraints
    EmptyPool {
        /// Grid cell (row, col) that could not be matched, when known
        cell: Option<[usize; 2]>,
        /// Number of tiles in the pool, eligible or not
        pool_size: usize,
    },

    /// A metric name was not found in the registry
    UnknownMetric {
        /// Requested metric name
        name: String,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// A grid build step was invoked out of order
    InvalidStage {
        /// Operation that was attempted
        operation: &'static str,
        /// Stage the operation requires
        expected: &'static str,
        /// Stage the grid was actually in
        actual: &'static str,
    },

    /// Failed to save an image to disk
    ImageExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying image export error
        source: image::ImageError,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Numerical computation produced invalid result
    Computation {
        /// Name of the computation that failed
        operation: &'static str,
        /// Description of the failure
        reason: String,
    },
}

impl MosaicError {
    /// Process exit status reported by the command-line tool for this error
    ///
    /// Every variant maps to its own status from 3 upward; 1 and 2 stay with
    /// panics and command-line usage errors.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Decode { .. } => 3,
            Self::InvalidConversion { .. } => 4,
            Self::ShapeMismatch { .. } => 5,
            Self::ColourSpaceMismatch { .. } => 6,
            Self::EmptyPool { .. } => 7,
            Self::UnknownMetric { .. } => 8,
            Self::InvalidParameter { .. } => 9,
            Self::InvalidStage { .. } => 10,
            Self::ImageExport { .. } => 11,
            Self::FileSystem { .. } => 12,
            Self::Computation { .. } => 13,
        }
    }
}

impl fmt::Display for MosaicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode { path, source } => {
                write!(f, "Failed to decode image '{}': {source}", path.display())
            }
            Self::InvalidConversion { from, to } => {
                write!(f, "Invalid conversion from {from} to {to}: data is already {to}")
            }
            Self::ShapeMismatch { left, right } => {
                write!(
                    f,
                    "Shape mismatch: {}x{}x{} vs {}x{}x{}",
                    left[0], left[1], left[2], right[0], right[1], right[2]
                )
            }
            Self::ColourSpaceMismatch { expected, found } => {
                write!(f, "Colour space mismatch: expected {expected}, found {found}")
            }
            Self::EmptyPool { cell, pool_size } => match cell {
                Some([row, col]) => write!(
                    f,
                    "No eligible tile for cell ({row}, {col}) in a pool of {pool_size} tiles"
                ),
                None => write!(f, "No eligible tile in a pool of {pool_size} tiles"),
            },
            Self::UnknownMetric { name } => {
                write!(f, "Unknown metric '{name}'")
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::InvalidStage {
                operation,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Cannot {operation}: grid must be {expected} but is {actual}"
                )
            }
            Self::ImageExport { path, source } => {
                write!(
                    f,
                    "Failed to export image to '{}': {source}",
                    path.display()
                )
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::Computation { operation, reason } => {
                write!(f, "Computation error in {operation}: {reason}")
            }
        }
    }
}

impl std::error::Error for MosaicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode { source, .. } | Self::ImageExport { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for mosaic results
pub type Result<T> = std::result::Result<T, MosaicError>;

/// Additional context to enrich error messages
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Grid cell (row, col) being processed
    pub grid_position: Option<[usize; 2]>,
    /// Operation being performed
    pub operation: Option<&'static str>,
}

/// Enriches errors with grid state information
pub trait WithContext<T> {
    /// Add error context to a Result
    ///
    /// # Errors
    ///
    /// Propagates the original error with additional context applied
    fn with_context(self, context: ErrorContext) -> Result<T>;

    /// Add just the grid position
    ///
    /// # Errors
    ///
    /// Propagates the original error with the position applied
    fn with_cell(self, row: usize, col: usize) -> Result<T>;
}

impl<T, E> WithContext<T> for std::result::Result<T, E>
where
    E: Into<MosaicError>,
{
    fn with_context(self, context: ErrorContext) -> Result<T> {
        self.map_err(|e| {
            let mut error = e.into();
            // Only pool exhaustion is reported per cell
            if let MosaicError::EmptyPool { cell, .. } = &mut error {
                if let Some(position) = context.grid_position {
                    *cell = Some(position);
                }
            }
            error
        })
    }

    fn with_cell(self, row: usize, col: usize) -> Result<T> {
        self.with_context(ErrorContext {
            grid_position: Some([row, col]),
            ..Default::default()
        })
    }
}

impl From<std::io::Error> for MosaicError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> MosaicError {
    MosaicError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a computation error
pub fn computation_error(operation: &'static str, reason: &impl ToString) -> MosaicError {
    MosaicError::Computation {
        operation,
        reason: reason.to_string(),
    }
}

/// Create a shape mismatch error from two ndarray shapes
pub fn shape_mismatch(left: &[usize], right: &[usize]) -> MosaicError {
    let pad = |shape: &[usize]| {
        let mut out = [0; 3];
        for (dst, &src) in out.iter_mut().zip(shape) {
            *dst = src;
        }
        out
    };
    MosaicError::ShapeMismatch {
        left: pad(left),
        right: pad(right),
    }
}
