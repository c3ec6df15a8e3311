/// Default project manifest file name, looked up in the current directory.
pub const MANIFEST_FILE: &str = "varbuild.toml";

pub const DEFAULT_COMPILER: &str = "gfortran";
pub const DEFAULT_OBJECT_DIR: &str = "obj";

pub const OBJECT_EXT: &str = "o";

/// Records which flag set produced the objects in the object directory.
pub const STAMP_FILE: &str = ".varbuild-stamp";

pub const LOCK_FILENAME: &str = ".lock";

pub const ENV_OS: &str = "OS";
pub const ENV_MSYSTEM: &str = "MSYSTEM";
pub const ENV_COMPILER: &str = "FC";
pub const ENV_JOBS: &str = "VARBUILD_JOBS";
