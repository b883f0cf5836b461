//! Crate-wide constants.

/// Application name, used for default directory resolution.
pub const APP_NAME: &str = "holdall";

/// Environment variable overriding the local storage root.
pub const HOME_ENV: &str = "HOLDALL_HOME";

/// File name of the bundle definition inside an archive layout.
pub const BUNDLE_FILENAME: &str = "bundle.json";

/// Subdirectory of an archive layout holding image blobs.
pub const IMAGES_DIR: &str = "images";

/// In-container path at which the relocation mapping is mounted, so the
/// running invocation image can resolve relocated component references.
pub const RELOCATION_MOUNT_PATH: &str = "/cnab/app/relocation-mapping.json";
