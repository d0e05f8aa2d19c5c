pub mod affine;
pub mod fit;
pub mod orchestrator;
pub mod rotation;

pub use affine::Affine2;
pub use fit::{resolve, visible_source_region, FitMode, Region, ScaleOffset, Size};
pub use orchestrator::{
    calculate_transformation, check_config, effective_rotation, generate_test_points,
    invert_matrix, transform_point, transform_points, validate_round_trip, MirrorMode,
    RoundTripReport, TransformConfig, TransformError, TransformState, MIN_ACCURACY_RATIO,
};
pub use rotation::{
    display_rotation, is_standard_rotation, normalize_angle, rotation_about_center,
    rotation_delta, RotationEngine,
};
