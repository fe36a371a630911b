//! # Artifact Naming
//!
//! File names of the developer `assets/tuningfork/` folder and the
//! locations of the packaged binaries inside APKs and app bundles.

use regex::Regex;

/// Settings and proto file names of the `assets/tuningfork` folder.
#[derive(Debug, Clone, Copy)]
pub struct FolderConfig;

impl FolderConfig {
    pub const DEV_TUNINGFORK_PROTO: &'static str = "dev_tuningfork.proto";
    pub const DEV_TUNINGFORK_DESCRIPTOR: &'static str = "dev_tuningfork.descriptor";
    pub const TUNINGFORK_SETTINGS_TEXTPROTO: &'static str = "tuningfork_settings.txt";
    pub const TUNINGFORK_SETTINGS_BINARY: &'static str = "tuningfork_settings.bin";
    pub const DEV_FIDELITY_TEXTPROTO: &'static str =
        r"^dev_tuningfork_fidelityparams_.{1,120}\.txt$";

    /// Compiled pattern for developer fidelity-parameter text files.
    pub fn dev_fidelity_text_pattern() -> Result<Regex, regex::Error> {
        Regex::new(Self::DEV_FIDELITY_TEXTPROTO)
    }

    /// Binary output name for a fidelity-parameter text file name:
    /// the trailing `.txt` becomes `.bin`.
    pub fn binary_name_for_text(file_name: &str) -> String {
        match file_name.strip_suffix(".txt") {
            Some(stem) => format!("{stem}.bin"),
            None => format!("{file_name}.bin"),
        }
    }

    /// Sort key of a fidelity-parameter file: the first run of ASCII digits
    /// in the name, or 0 when the name has none.
    ///
    /// Runs too long for `u64` saturate to `u64::MAX`.
    pub fn file_number(file_name: &str) -> u64 {
        let digits: String = file_name
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if digits.is_empty() {
            return 0;
        }
        digits.parse().unwrap_or(u64::MAX)
    }
}

/// Locations of Tuning Fork binaries inside packaged apps.
#[derive(Debug, Clone, Copy)]
pub struct TuningForkPaths;

impl TuningForkPaths {
    pub const BUNDLE_TUNINGFORK_PATH: &'static str = "base/assets/tuningfork/";
    pub const APK_TUNINGFORK_PATH: &'static str = "assets/tuningfork/";

    pub fn descriptor_pattern(base: &str) -> Result<Regex, regex::Error> {
        Regex::new(&format!(
            r"^({})dev_tuningfork\.descriptor$",
            regex::escape(base)
        ))
    }

    pub fn settings_pattern(base: &str) -> Result<Regex, regex::Error> {
        Regex::new(&format!(
            r"^({})tuningfork_settings\.bin$",
            regex::escape(base)
        ))
    }

    /// Fidelity binaries; capture group 2 holds the file number.
    pub fn fidelity_param_pattern(base: &str) -> Result<Regex, regex::Error> {
        Regex::new(&format!(
            r"^({})dev_tuningfork_fidelityparams_(\d+)\.bin$",
            regex::escape(base)
        ))
    }
}
