//! Parameter value structs for the dewarping model
//!
//! These are plain value objects supplied by the surrounding pipeline.
//! Each carries an auto/manual mode switch: in auto mode the model derives
//! the value itself (clamped to the struct's min/max), in manual mode the
//! stored value is used as-is.
//!
//! # See also
//!
//! ScanTailor: `FovParams.h`, `FrameParams.h`, `BendParams.h`,
//! `SizeParams.h`

/// Whether a parameter is derived automatically or supplied manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Derive the value from the model, clamped to the configured range
    #[default]
    Auto,
    /// Use the stored value as-is
    Manual,
}

/// Field-of-view parameters
///
/// The field of view is expressed as a dimensionless multiple of the frame
/// size; the effective focal length is `frame_size / fov`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FovParams {
    /// Auto: solve for a fov consistent with the homography, clamped to
    /// `[fov_min, fov_max]`. Manual: use `fov` directly.
    pub mode: Mode,
    /// Lower clamp for auto mode (default: 0.2)
    pub fov_min: f64,
    /// Manual field of view (default: 1.5)
    pub fov: f64,
    /// Upper clamp for auto mode (default: 2.0)
    pub fov_max: f64,
}

impl FovParams {
    /// Smallest accepted fov value
    pub const MIN_VALUE: f64 = 0.001;
    /// Largest accepted fov value
    pub const MAX_VALUE: f64 = 10.0;
}

impl Default for FovParams {
    fn default() -> Self {
        Self {
            mode: Mode::Auto,
            fov_min: 0.2,
            fov: 1.5,
            fov_max: 2.0,
        }
    }
}

/// Camera frame parameters
///
/// Describes the frame the photo was taken with: its size in pixels and
/// the position of the optical center within the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    /// Auto: derive the frame from the image being processed. Manual: use
    /// the stored values.
    pub mode: Mode,
    /// Frame width in pixels (default: 1024)
    pub width: f64,
    /// Frame height in pixels (default: 1024)
    pub height: f64,
    /// X coordinate of the optical center (default: 0.5)
    pub center_x: f64,
    /// Y coordinate of the optical center (default: 0.5)
    pub center_y: f64,
}

impl FrameParams {
    /// Smallest accepted frame dimension
    pub const MIN_SIZE: f64 = 1.0;
    /// Largest accepted frame dimension
    pub const MAX_SIZE: f64 = 32768.0;

    /// The larger of the two frame dimensions.
    pub fn size(&self) -> f64 {
        self.width.max(self.height)
    }

    /// Derive frame parameters from the processed image dimensions.
    ///
    /// In auto mode the frame covers the whole image with the optical
    /// center in the middle. In manual mode `self` is returned unchanged.
    pub fn updated_for_image(&self, width: f64, height: f64) -> Self {
        match self.mode {
            Mode::Auto => Self {
                mode: Mode::Auto,
                width,
                height,
                center_x: 0.5 * width,
                center_y: 0.5 * height,
            },
            Mode::Manual => *self,
        }
    }
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            mode: Mode::Auto,
            width: 1024.0,
            height: 1024.0,
            center_x: 0.5,
            center_y: 0.5,
        }
    }
}

/// Page bend parameters
///
/// Bend measures how far the page surface departs from flat, as a signed
/// fraction of page height. The model reports the measured bend; in auto
/// mode the measured value is clamped to `[bend_min, bend_max]`, in manual
/// mode the profile is rescaled to the stored value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BendParams {
    /// Auto: clamp the measured bend. Manual: rescale to `bend`.
    pub mode: Mode,
    /// Lower clamp for auto mode (default: -0.5)
    pub bend_min: f64,
    /// Manual bend value (default: 0.15)
    pub bend: f64,
    /// Upper clamp for auto mode (default: 0.5)
    pub bend_max: f64,
}

impl BendParams {
    /// Smallest accepted bend value
    pub const MIN_VALUE: f64 = -1.0;
    /// Largest accepted bend value
    pub const MAX_VALUE: f64 = 1.0;
}

impl Default for BendParams {
    fn default() -> Self {
        Self {
            mode: Mode::Auto,
            bend_min: -0.5,
            bend: 0.15,
            bend_max: 0.5,
        }
    }
}

/// The kind of distortion correction selected for a page.
///
/// Only the last two variants involve the cylindrical surface model;
/// `None` and `Rotation` are handled by plain affine transforms in the
/// surrounding pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistortionType {
    /// No correction
    #[default]
    None,
    /// Pure in-plane rotation
    Rotation,
    /// Flat page photographed at an angle
    Perspective,
    /// Curved page surface
    Warp,
}

impl DistortionType {
    /// Whether this distortion type requires building a dewarping model.
    pub fn needs_dewarping(self) -> bool {
        matches!(self, DistortionType::Perspective | DistortionType::Warp)
    }
}

/// How the output image dimensions are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeMode {
    /// Preserve the pixel area of the curved quadrilateral
    #[default]
    ByArea,
    /// Fit into the given width and height, preserving aspect ratio
    Fit,
    /// Stretch to exactly the given width and height
    Stretch,
    /// Derive from a given camera-to-page distance
    ByDistance,
}

/// Output size parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeParams {
    /// Size derivation mode (default: [`SizeMode::ByArea`])
    pub mode: SizeMode,
    /// Target width for [`SizeMode::Fit`] / [`SizeMode::Stretch`]
    /// (default: 1024)
    pub width: f64,
    /// Target height for [`SizeMode::Fit`] / [`SizeMode::Stretch`]
    /// (default: 1024)
    pub height: f64,
    /// Distance for [`SizeMode::ByDistance`] (default: 1024)
    pub distance: f64,
}

impl SizeParams {
    /// Smallest accepted output dimension
    pub const MIN_SIZE: f64 = 1.0;
    /// Largest accepted output dimension
    pub const MAX_SIZE: f64 = 32768.0;
    /// Largest accepted distance value
    pub const MAX_DISTANCE: f64 = 3276800.0;
}

impl Default for SizeParams {
    fn default() -> Self {
        Self {
            mode: SizeMode::ByArea,
            width: 1024.0,
            height: 1024.0,
            distance: 1024.0,
        }
    }
}
