//! Configuration loading
//!
//! Loads robot configuration from TOML text, falling back to a postcard
//! binary image, and finally to the built-in defaults if neither is stored.

use reefbot_core::config::{FeedbackConfig, RobotConfig, CONFIG_VERSION};

/// Configuration loading errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// TOML parsing failed
    TomlParse,
    /// Binary deserialization failed
    Deserialize,
    /// Config version mismatch
    VersionMismatch,
    /// A value is out of range; names the offending field
    Invalid(&'static str),
}

/// Load configuration
///
/// Tries the TOML text first and falls back to the binary image. Returns
/// the defaults when neither is present.
pub fn load(toml: Option<&str>, binary: Option<&[u8]>) -> Result<RobotConfig, ConfigError> {
    info!("Loading configuration...");

    if let Some(text) = toml {
        match parse_toml(text) {
            Ok(config) => {
                info!("Loaded configuration from TOML");
                return Ok(config);
            }
            Err(e) if binary.is_none() => return Err(e),
            Err(_) => {
                warn!("Failed to load TOML config, trying binary");
            }
        }
    } else {
        debug!("No TOML config found, trying binary format");
    }

    match binary {
        Some(bytes) => load_binary(bytes),
        None => {
            info!("No stored configuration, using defaults");
            Ok(RobotConfig::default())
        }
    }
}

/// Parse and validate TOML configuration text
pub fn parse_toml(text: &str) -> Result<RobotConfig, ConfigError> {
    debug!("Parsing {=usize} bytes of TOML", text.len());

    let config: RobotConfig = toml::from_str(text).map_err(|_| {
        warn!("TOML parse error");
        ConfigError::TomlParse
    })?;

    validate(&config)?;
    log_config_summary(&config);
    Ok(config)
}

/// Deserialize and validate a postcard configuration image
pub fn load_binary(bytes: &[u8]) -> Result<RobotConfig, ConfigError> {
    debug!("Read {=usize} bytes of binary config", bytes.len());

    let config: RobotConfig =
        postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;

    validate(&config)?;
    log_config_summary(&config);
    Ok(config)
}

/// Check version and value ranges
pub fn validate(config: &RobotConfig) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        warn!(
            "Config version mismatch: found {=u8}, expected {=u8}",
            config.version,
            CONFIG_VERSION
        );
        return Err(ConfigError::VersionMismatch);
    }

    check(config.tick_period_ms > 0, "tick_period_ms")?;

    let lift = &config.lift;
    check_feedback(&lift.feedback, "lift.feedback")?;
    check(is_percent(lift.max_speed_percent), "lift.max_speed_percent")?;
    check(lift.gear_reduction > 0.0, "lift.gear_reduction")?;
    check(lift.sprocket_diameter_in > 0.0, "lift.sprocket_diameter_in")?;
    check(lift.min_height_in < lift.max_height_in, "lift.max_height_in")?;
    check(
        lift.levels_in
            .iter()
            .all(|h| *h >= lift.min_height_in && *h <= lift.max_height_in),
        "lift.levels_in",
    )?;

    let aligner = &config.aligner;
    check_feedback(&aligner.lateral, "aligner.lateral")?;
    check_feedback(&aligner.approach, "aligner.approach")?;
    check(aligner.max_output > 0.0, "aligner.max_output")?;

    check(config.drive.max_speed_mps > 0.0, "drive.max_speed_mps")?;
    check(config.drive.max_angular_rate > 0.0, "drive.max_angular_rate")?;
    check(is_percent(config.rollers.max_speed_percent), "rollers.max_speed_percent")?;
    check(is_percent(config.winch.max_speed_percent), "winch.max_speed_percent")?;

    let routines = &config.routines;
    check(is_percent(routines.eject_percent), "routines.eject_percent")?;
    for (leg, field) in [
        (&routines.reef_leg, "routines.reef_leg"),
        (&routines.loading_leg, "routines.loading_leg"),
        (&routines.leave_leg, "routines.leave_leg"),
    ] {
        check(leg.distance_m > 0.0, field)?;
    }

    Ok(())
}

fn check_feedback(feedback: &FeedbackConfig, field: &'static str) -> Result<(), ConfigError> {
    check(feedback.tolerance >= 0.0, field)?;
    check(feedback.period_s > 0.0, field)?;
    check(feedback.integral_limit >= 0.0, field)?;
    match feedback.integral_zone {
        Some(zone) => check(zone >= 0.0, field),
        None => Ok(()),
    }
}

/// `ok` must be a positive comparison so NaN values fail
fn check(ok: bool, field: &'static str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        warn!("Invalid config value: {=str}", field);
        Err(ConfigError::Invalid(field))
    }
}

fn is_percent(value: f32) -> bool {
    value > 0.0 && value <= 100.0
}

/// Log a summary of the loaded configuration
fn log_config_summary(config: &RobotConfig) {
    info!("Configuration loaded successfully");
    debug!("  tick period {=u32} ms", config.tick_period_ms);
    debug!(
        "  lift {=f32}..{=f32} in",
        config.lift.min_height_in,
        config.lift.max_height_in
    );
    debug!("  drive max {=f32} m/s", config.drive.max_speed_mps);
    debug!("  continuous align {=bool}", config.routines.continuous_align);
}
