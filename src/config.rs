use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::yolo::{YoloParams, DEFAULT_CONFIDENCE, DEFAULT_INPUT_SIZE, DEFAULT_IOU};
use crate::detect::ClassMap;
use crate::display::DEFAULT_SNAPSHOT_INTERVAL;
use crate::ingest::{SourceKind, SourceSettings};
use crate::notify::DEFAULT_INTERVAL;
use crate::region::RegionBounds;
use crate::serial::{SerialSettings, DEFAULT_BAUD};

pub const CONFIG_ENV: &str = "LANE_SENSOR_CONFIG";
pub const DEFAULT_LANE: u8 = 2;
const DEFAULT_VIDEO_DELAY_MS: u64 = 25;
const DEFAULT_CAMERA_DELAY_MS: u64 = 1;
const DEFAULT_DETECTOR_SEED: u64 = 0x1a2e;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SensorConfigFile {
    lane: Option<u8>,
    source: Option<SourceConfigFile>,
    region: Option<RegionConfigFile>,
    classes: Option<ClassesConfigFile>,
    detector: Option<DetectorConfigFile>,
    serial: Option<SerialConfigFile>,
    notify: Option<NotifyConfigFile>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SourceConfigFile {
    kind: Option<SourceKind>,
    path: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
    loop_playback: Option<bool>,
    resize: Option<bool>,
    clip_frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RegionConfigFile {
    top: Option<u32>,
    bottom: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ClassesConfigFile {
    names: Option<Vec<String>>,
    priority: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    model: Option<PathBuf>,
    input_size: Option<u32>,
    confidence: Option<f32>,
    iou: Option<f32>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SerialConfigFile {
    port: Option<String>,
    baud: Option<u32>,
    settle_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct NotifyConfigFile {
    interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DisplayConfigFile {
    snapshot_path: Option<PathBuf>,
    snapshot_interval_ms: Option<u64>,
    font: Option<PathBuf>,
    frame_delay_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// Lane number reported in every command.
    pub lane: u8,
    pub source: SourceSettings,
    pub region: RegionBounds,
    pub classes: ClassMap,
    pub detector: DetectorSettings,
    pub serial: SerialSettings,
    pub notify_interval: Duration,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    /// ONNX model path. `None` selects the synthetic stub detector.
    pub model: Option<PathBuf>,
    pub params: YoloParams,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub snapshot_path: Option<PathBuf>,
    pub snapshot_interval: Duration,
    pub font: Option<PathBuf>,
    /// Pause between frames. Unset picks 25 ms for video, 1 ms for cameras.
    pub frame_delay: Option<Duration>,
}

impl DisplaySettings {
    pub fn frame_delay_for(&self, kind: SourceKind) -> Duration {
        self.frame_delay.unwrap_or(match kind {
            SourceKind::Video => Duration::from_millis(DEFAULT_VIDEO_DELAY_MS),
            SourceKind::Camera => Duration::from_millis(DEFAULT_CAMERA_DELAY_MS),
        })
    }
}

impl SensorConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(CONFIG_ENV).ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document without consulting the environment.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: SensorConfigFile =
            toml::from_str(raw).map_err(|e| anyhow!("invalid config: {}", e))?;
        let cfg = Self::from_file(file)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SensorConfigFile) -> Result<Self> {
        let defaults = SourceSettings::default();
        let source_file = file.source.unwrap_or_default();
        let source = SourceSettings {
            kind: source_file.kind.unwrap_or(defaults.kind),
            path: source_file.path.unwrap_or(defaults.path),
            width: source_file.width.unwrap_or(defaults.width),
            height: source_file.height.unwrap_or(defaults.height),
            target_fps: source_file.target_fps.unwrap_or(defaults.target_fps),
            loop_playback: source_file.loop_playback.unwrap_or(defaults.loop_playback),
            resize: source_file.resize.unwrap_or(defaults.resize),
            clip_frames: source_file.clip_frames.unwrap_or(defaults.clip_frames),
        };

        let region_file = file.region.unwrap_or_default();
        let default_region = RegionBounds::default();
        let region = RegionBounds {
            top: region_file.top.unwrap_or(default_region.top),
            bottom: region_file.bottom.unwrap_or(default_region.bottom),
        };

        let classes = match file.classes {
            Some(classes) => {
                let defaults = ClassMap::default();
                ClassMap::new(
                    classes.names.unwrap_or_else(|| defaults.names().to_vec()),
                    classes.priority.unwrap_or(defaults.priority()),
                )?
            }
            None => ClassMap::default(),
        };

        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            model: detector_file.model,
            params: YoloParams {
                input_size: detector_file.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
                confidence: detector_file.confidence.unwrap_or(DEFAULT_CONFIDENCE),
                iou: detector_file.iou.unwrap_or(DEFAULT_IOU),
            },
            seed: detector_file.seed.unwrap_or(DEFAULT_DETECTOR_SEED),
        };

        let serial_file = file.serial.unwrap_or_default();
        let serial = SerialSettings {
            port: serial_file.port.filter(|port| !port.trim().is_empty()),
            baud: serial_file.baud.unwrap_or(DEFAULT_BAUD),
            settle: Duration::from_millis(serial_file.settle_ms.unwrap_or(0)),
        };

        let notify_interval = file
            .notify
            .and_then(|notify| notify.interval_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_INTERVAL);

        let display_file = file.display.unwrap_or_default();
        let display = DisplaySettings {
            snapshot_path: display_file.snapshot_path,
            snapshot_interval: display_file
                .snapshot_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_SNAPSHOT_INTERVAL),
            font: display_file.font,
            frame_delay: display_file.frame_delay_ms.map(Duration::from_millis),
        };

        Ok(Self {
            lane: file.lane.unwrap_or(DEFAULT_LANE),
            source,
            region,
            classes,
            detector,
            serial,
            notify_interval,
            display,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("LANE_SENSOR_SOURCE") {
            if !source.trim().is_empty() {
                // "camera", "video", or a path/URI for the configured kind.
                match source.parse::<SourceKind>() {
                    Ok(kind) => self.source.kind = kind,
                    Err(_) => self.source.path = source,
                }
            }
        }
        if let Ok(port) = std::env::var("LANE_SENSOR_SERIAL_PORT") {
            if !port.trim().is_empty() {
                self.serial.port = Some(port);
            }
        }
        if let Ok(baud) = std::env::var("LANE_SENSOR_SERIAL_BAUD") {
            self.serial.baud = baud
                .trim()
                .parse()
                .map_err(|_| anyhow!("LANE_SENSOR_SERIAL_BAUD must be an integer baud rate"))?;
        }
        if let Ok(lane) = std::env::var("LANE_SENSOR_LANE") {
            self.lane = lane
                .trim()
                .parse()
                .map_err(|_| anyhow!("LANE_SENSOR_LANE must be a lane number (0-255)"))?;
        }
        if let Ok(model) = std::env::var("LANE_SENSOR_MODEL") {
            if !model.trim().is_empty() {
                self.detector.model = Some(PathBuf::from(model));
            }
        }
        if let Ok(interval) = std::env::var("LANE_SENSOR_INTERVAL_MS") {
            let millis: u64 = interval.trim().parse().map_err(|_| {
                anyhow!("LANE_SENSOR_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.notify_interval = Duration::from_millis(millis);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.region.validate()?;
        if self.source.path.trim().is_empty() {
            return Err(anyhow!("source path must not be empty"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source resolution must be non-zero"));
        }
        if self.serial.baud == 0 {
            return Err(anyhow!("serial baud rate must be greater than zero"));
        }
        let params = &self.detector.params;
        if params.input_size == 0 {
            return Err(anyhow!("detector input_size must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&params.confidence) || !(0.0..=1.0).contains(&params.iou) {
            return Err(anyhow!("detector confidence and iou must be within 0..=1"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SensorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let cfg = if is_json {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = SensorConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.lane, 2);
        assert_eq!(cfg.region, RegionBounds::default());
        assert_eq!(cfg.notify_interval, Duration::from_secs(1));
        assert_eq!(cfg.serial.baud, 115_200);
        assert!(cfg.serial.port.is_none());
        assert_eq!(cfg.classes, ClassMap::default());
        assert_eq!(
            cfg.display.frame_delay_for(SourceKind::Video),
            Duration::from_millis(25)
        );
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = SensorConfig::from_toml_str(
            r#"
lane = 3

[source]
kind = "video"
path = "traffic.mp4"
loop_playback = false

[region]
top = 100
bottom = 500

[classes]
names = ["car", "truck", "ambulance"]
priority = 2

[notify]
interval_ms = 500
"#,
        )
        .unwrap();
        assert_eq!(cfg.lane, 3);
        assert_eq!(cfg.source.kind, SourceKind::Video);
        assert!(!cfg.source.loop_playback);
        assert_eq!(cfg.region, RegionBounds { top: 100, bottom: 500 });
        assert_eq!(cfg.classes.priority(), 2);
        assert_eq!(cfg.notify_interval, Duration::from_millis(500));
    }

    #[test]
    fn inverted_region_is_rejected() {
        let err = SensorConfig::from_toml_str("[region]\ntop = 600\nbottom = 200\n");
        assert!(err.is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(SensorConfig::from_toml_str("[serial]\nspeed = 9600\n").is_err());
    }
}
