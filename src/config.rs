//! Daemon configuration.
//!
//! Loaded from TOML. Every section and field is optional; missing values
//! take the defaults below. [`Config::validate`] must pass before any thread
//! or subscription is created.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};
use crate::fusion::{AnchorMode, FusionConfig};
use crate::odometry::{EstimatorConfig, OrchestratorConfig};
use crate::sensors::ChannelId;

/// Slowest accepted control loop rate (one tick every ~17 minutes).
pub const MIN_TICK_RATE_HZ: f64 = 1e-3;

/// Paths tried, in order, when no config file is given.
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["gati-loam.toml", "/etc/gati-loam.toml"];

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub odometry: OdometryParams,
    #[serde(default)]
    pub frames: FrameNames,
    #[serde(default)]
    pub topics: TopicNames,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub fusion: FusionParams,
    #[serde(default)]
    pub bag: BagConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OdometryParams {
    /// Sweep duration in seconds
    pub scan_period: f64,
    /// Publish clouds every `io_ratio` processed frames
    pub io_ratio: u32,
    pub max_iterations: usize,
    pub delta_t_abort: f64,
    pub delta_r_abort: f64,
    /// Control loop rate
    pub tick_rate_hz: f64,
}

impl Default for OdometryParams {
    fn default() -> Self {
        let estimator = EstimatorConfig::default();
        Self {
            scan_period: estimator.scan_period,
            io_ratio: 2,
            max_iterations: estimator.max_iterations,
            delta_t_abort: estimator.delta_t_abort,
            delta_r_abort: estimator.delta_r_abort,
            tick_rate_hz: 100.0,
        }
    }
}

/// Coordinate frame names stamped on published messages.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FrameNames {
    /// Fixed frame of the first sweep
    pub init_frame: String,
    /// Frame of the laser odometry estimate
    pub odom_frame: String,
    /// Sensor frame
    pub lidar_frame: String,
}

impl Default for FrameNames {
    fn default() -> Self {
        Self {
            init_frame: "camera_init".to_string(),
            odom_frame: "laser_odom".to_string(),
            lidar_frame: "camera".to_string(),
        }
    }
}

/// Topic name overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TopicNames {
    pub corner_sharp: String,
    pub corner_less_sharp: String,
    pub surf_flat: String,
    pub surf_less_flat: String,
    pub cloud_in: String,
    pub imu_trans: String,

    /// Laser odometry output, also the fast input of fusion
    pub laser_odom: String,
    /// Corrected pose from the map corrector
    pub map_odom: String,
    /// Fused output
    pub integrated_odom: String,
    pub corner_last: String,
    pub surf_last: String,
    pub full_res: String,
}

impl Default for TopicNames {
    fn default() -> Self {
        Self {
            corner_sharp: ChannelId::CornerSharp.default_topic().to_string(),
            corner_less_sharp: ChannelId::CornerLessSharp.default_topic().to_string(),
            surf_flat: ChannelId::SurfFlat.default_topic().to_string(),
            surf_less_flat: ChannelId::SurfLessFlat.default_topic().to_string(),
            cloud_in: ChannelId::FullRes.default_topic().to_string(),
            imu_trans: ChannelId::ImuTrans.default_topic().to_string(),
            laser_odom: "laser_odom_to_init".to_string(),
            map_odom: "aft_mapped_to_init".to_string(),
            integrated_odom: "integrated_to_init".to_string(),
            corner_last: "laser_cloud_corner_last".to_string(),
            surf_last: "laser_cloud_surf_last".to_string(),
            full_res: "velodyne_cloud_3".to_string(),
        }
    }
}

impl TopicNames {
    /// Input topic of a channel.
    pub fn channel(&self, channel: ChannelId) -> &str {
        match channel {
            ChannelId::CornerSharp => &self.corner_sharp,
            ChannelId::CornerLessSharp => &self.corner_less_sharp,
            ChannelId::SurfFlat => &self.surf_flat,
            ChannelId::SurfLessFlat => &self.surf_less_flat,
            ChannelId::FullRes => &self.cloud_in,
            ChannelId::ImuTrans => &self.imu_trans,
        }
    }

    /// Channel fed by an input topic, if `topic` is one.
    pub fn input_channel(&self, topic: &str) -> Option<ChannelId> {
        ChannelId::ALL
            .into_iter()
            .find(|&channel| self.channel(channel) == topic)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Broadcast frame transforms alongside pose messages
    pub transforms: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { transforms: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FusionParams {
    /// Diagonal of the fused pose covariance (6 values)
    pub covariance: Vec<f64>,
    pub anchor: AnchorMode,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            covariance: vec![0.0; 6],
            anchor: AnchorMode::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BagConfig {
    /// Bag file to replay into the synchronizer (None for live input)
    pub file: Option<String>,
    pub loop_playback: bool,
    /// Replay speed factor, 0 for as fast as possible
    pub speed: f32,
    /// Record published messages to this bag
    pub record: Option<String>,
}

impl Default for BagConfig {
    fn default() -> Self {
        Self {
            file: None,
            loop_playback: false,
            speed: 1.0,
            record: None,
        }
    }
}

// ============================================================================
// Loading and validation
// ============================================================================

impl Config {
    /// Parse a TOML document.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        basic_toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from `path`, or from the first readable default path, or fall
    /// back to built-in defaults.
    ///
    /// An explicit path that cannot be read or parsed is an error. A default
    /// path that exists but fails to parse is also an error.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = path {
            let contents = fs::read_to_string(path)?;
            let config = Self::from_toml_str(&contents)?;
            log::info!("Loaded config from {}", path.display());
            return Ok(config);
        }

        for candidate in DEFAULT_CONFIG_PATHS {
            if let Ok(contents) = fs::read_to_string(candidate) {
                let config = Self::from_toml_str(&contents)?;
                log::info!("Loaded config from {}", candidate);
                return Ok(config);
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Check every numeric parameter. Returns the first violation.
    pub fn validate(&self) -> ConfigResult<()> {
        self.estimator().validate()?;
        self.orchestrator().validate()?;

        let odom = &self.odometry;
        if !(odom.tick_rate_hz >= MIN_TICK_RATE_HZ && odom.tick_rate_hz.is_finite()) {
            return Err(ConfigError::invalid(
                "odometry.tick_rate_hz",
                odom.tick_rate_hz,
                ">= 0.001",
            ));
        }

        self.fusion()?;

        if !(self.bag.speed >= 0.0 && self.bag.speed.is_finite()) {
            return Err(ConfigError::invalid("bag.speed", self.bag.speed, ">= 0"));
        }

        Ok(())
    }

    /// Estimator policy from the `[odometry]` section.
    pub fn estimator(&self) -> EstimatorConfig {
        EstimatorConfig {
            scan_period: self.odometry.scan_period,
            max_iterations: self.odometry.max_iterations,
            delta_t_abort: self.odometry.delta_t_abort,
            delta_r_abort: self.odometry.delta_r_abort,
        }
    }

    /// Orchestrator settings.
    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            io_ratio: self.odometry.io_ratio,
            frames: self.frames.clone(),
            topics: self.topics.clone(),
            publish_transforms: self.output.transforms,
        }
    }

    /// Fusion settings. Fails if the covariance does not have 6 entries.
    pub fn fusion(&self) -> ConfigResult<FusionConfig> {
        let covariance: [f64; 6] = self.fusion.covariance.as_slice().try_into().map_err(|_| {
            ConfigError::invalid(
                "fusion.covariance",
                format!("{:?}", self.fusion.covariance),
                "exactly 6 values",
            )
        })?;

        Ok(FusionConfig {
            covariance_diagonal: covariance,
            anchor: self.fusion.anchor,
            frames: self.frames.clone(),
            topics: self.topics.clone(),
            publish_transforms: self.output.transforms,
        })
    }

    /// Log non-default values at debug level.
    pub fn log_overrides(&self) {
        let defaults = OdometryParams::default();
        if self.odometry.scan_period != defaults.scan_period {
            log::debug!("Set scan_period: {}", self.odometry.scan_period);
        }
        if self.odometry.io_ratio != defaults.io_ratio {
            log::debug!("Set io_ratio: {}", self.odometry.io_ratio);
        }
        if self.odometry.max_iterations != defaults.max_iterations {
            log::debug!("Set max_iterations: {}", self.odometry.max_iterations);
        }
        if self.odometry.delta_t_abort != defaults.delta_t_abort {
            log::debug!("Set delta_t_abort: {}", self.odometry.delta_t_abort);
        }
        if self.odometry.delta_r_abort != defaults.delta_r_abort {
            log::debug!("Set delta_r_abort: {}", self.odometry.delta_r_abort);
        }
        if self.frames != FrameNames::default() {
            log::debug!("Set frames: {:?}", self.frames);
        }
        if self.topics != TopicNames::default() {
            log::debug!("Set topics: {:?}", self.topics);
        }
    }
}
