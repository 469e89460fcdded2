use directories::ProjectDirs;
use std::path::PathBuf;

pub const APP_QUALIFIER: &str = "com";
pub const APP_ORG: &str = "paramfile";
pub const APP_NAME: &str = "paramfile";

pub const CONFIG_FILE_NAME: &str = "paramfile.conf";
pub const PARAMS_FILE_NAME: &str = "params.dat";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
}

/// Default location of the CLI config file. `PARAMFILE_CONFIG` overrides it;
/// without a home directory it falls back to the working directory.
pub fn config_path() -> PathBuf {
    if let Ok(override_path) = std::env::var("PARAMFILE_CONFIG") {
        return PathBuf::from(override_path);
    }
    project_dirs()
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Default location of the parameter file.
pub fn data_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(PARAMS_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(PARAMS_FILE_NAME))
}
