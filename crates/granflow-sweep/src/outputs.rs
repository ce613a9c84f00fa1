//! Readers for the fixed-format files written by the simulation engine.

use std::fs;
use std::path::{Path, PathBuf};

use granflow_core::{integral_count_from_f64, ErrorInfo, FlowError, TrialConfig};
use serde::{Deserialize, Serialize};

/// Discharge event file name.
pub const DISCHARGES_FILE: &str = "discharges.txt";
/// Configuration echo file name.
pub const CONFIG_FILE: &str = "config.txt";
/// Obstacle layout file name.
pub const OBSTACLES_FILE: &str = "obstacles.txt";
/// Trajectory snapshot file name.
pub const SNAPSHOTS_FILE: &str = "snapshots.txt";

const CONFIG_FIELDS: usize = 13;

fn read_text(path: &Path) -> Result<String, FlowError> {
    fs::read_to_string(path).map_err(|err| {
        FlowError::Io(
            ErrorInfo::new("engine-output-read", err.to_string())
                .with_context("path", path.display()),
        )
    })
}

fn malformed(path: &Path, line: usize, message: impl Into<String>) -> FlowError {
    FlowError::Config(
        ErrorInfo::new("engine-output-malformed", message)
            .with_context("path", path.display())
            .with_context("line", line),
    )
}

fn parse_f64(path: &Path, line: usize, token: &str) -> Result<f64, FlowError> {
    let value: f64 = token
        .trim()
        .parse()
        .map_err(|_| malformed(path, line, format!("expected a number, found {token:?}")))?;
    if !value.is_finite() {
        return Err(malformed(path, line, format!("non-finite value {token:?}")));
    }
    Ok(value)
}

fn parse_pair(path: &Path, line: usize, text: &str) -> Result<(f64, f64), FlowError> {
    let mut tokens = text.split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(x), Some(y), None) => Ok((parse_f64(path, line, x)?, parse_f64(path, line, y)?)),
        _ => Err(malformed(path, line, format!("expected an \"x y\" pair, found {text:?}"))),
    }
}

// Line numbers reported to the user are 1-based.
fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
}

/// Reads discharge timestamps, skipping the informational count header.
pub fn read_discharges(dir: &Path) -> Result<Vec<f64>, FlowError> {
    let path = dir.join(DISCHARGES_FILE);
    let text = read_text(&path)?;
    let mut times = Vec::new();
    for (line, content) in content_lines(&text).skip(1) {
        let value = parse_f64(&path, line, content)?;
        if value < 0.0 {
            return Err(malformed(&path, line, format!("negative discharge time {value}")));
        }
        times.push(value);
    }
    Ok(times)
}

/// Configuration echoed by the engine into `config.txt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEcho {
    /// Channel width.
    pub width: f64,
    /// Channel length.
    pub length: f64,
    /// Number of obstacles, as written by the engine.
    pub obstacle_count: f64,
    /// Number of particles, as written by the engine.
    pub particle_count: f64,
    /// Obstacle radius.
    pub obstacle_radius: f64,
    /// Particle radius.
    pub particle_radius: f64,
    /// Particle mass.
    pub particle_mass: f64,
    /// Driving acceleration.
    pub acceleration: f64,
    /// Normal contact stiffness.
    pub normal_k: f64,
    /// Tangential contact stiffness.
    pub tangential_k: f64,
    /// Integration time step.
    pub integration_step: f64,
    /// Interval between trajectory snapshots.
    pub snapshot_step: f64,
    /// Simulated duration.
    pub max_time: f64,
    /// Present only for engine versions that echo their seed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<f64>,
}

impl ConfigEcho {
    /// Configuration subset used by the analysis. Fails when the echoed
    /// obstacle count is not a non-negative integer.
    pub fn trial_config(&self) -> Result<TrialConfig, FlowError> {
        let obstacle_count = integral_count_from_f64(self.obstacle_count).map_err(|message| {
            FlowError::Config(
                ErrorInfo::new("engine-output-malformed", message)
                    .with_context("field", "obstacle_count"),
            )
        })?;
        Ok(TrialConfig {
            obstacle_count,
            acceleration: self.acceleration,
            particle_mass: self.particle_mass,
            max_time: self.max_time,
        })
    }
}

/// Reads the configuration echo; accepts the 13-field and seeded 14-field
/// layouts.
pub fn read_config_echo(dir: &Path) -> Result<ConfigEcho, FlowError> {
    let path = dir.join(CONFIG_FILE);
    let text = read_text(&path)?;
    let values = content_lines(&text)
        .map(|(line, content)| parse_f64(&path, line, content))
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() != CONFIG_FIELDS && values.len() != CONFIG_FIELDS + 1 {
        return Err(malformed(
            &path,
            values.len(),
            format!(
                "expected {} or {} values, found {}",
                CONFIG_FIELDS,
                CONFIG_FIELDS + 1,
                values.len()
            ),
        ));
    }
    Ok(ConfigEcho {
        width: values[0],
        length: values[1],
        obstacle_count: values[2],
        particle_count: values[3],
        obstacle_radius: values[4],
        particle_radius: values[5],
        particle_mass: values[6],
        acceleration: values[7],
        normal_k: values[8],
        tangential_k: values[9],
        integration_step: values[10],
        snapshot_step: values[11],
        max_time: values[12],
        seed: values.get(CONFIG_FIELDS).copied(),
    })
}

/// Reads obstacle centres, skipping the count header.
pub fn read_obstacles(dir: &Path) -> Result<Vec<(f64, f64)>, FlowError> {
    let path = dir.join(OBSTACLES_FILE);
    let text = read_text(&path)?;
    content_lines(&text)
        .skip(1)
        .map(|(line, content)| parse_pair(&path, line, content))
        .collect()
}

/// Particle positions at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulation time of the snapshot.
    pub time: f64,
    /// Particle centres.
    pub positions: Vec<(f64, f64)>,
}

/// Reads the trajectory snapshot file.
pub fn read_snapshots(dir: &Path) -> Result<Vec<Snapshot>, FlowError> {
    let path = dir.join(SNAPSHOTS_FILE);
    let text = read_text(&path)?;
    let mut lines = content_lines(&text);
    let (header_line, header) = lines
        .next()
        .ok_or_else(|| malformed(&path, 1, "missing snapshot header"))?;
    let mut fields = header.split_whitespace();
    let (particles, total) = match (fields.next(), fields.next(), fields.next()) {
        (Some(particles), Some(total), None) => (
            particles
                .parse::<usize>()
                .map_err(|_| malformed(&path, header_line, "invalid particle count"))?,
            total
                .parse::<usize>()
                .map_err(|_| malformed(&path, header_line, "invalid snapshot count"))?,
        ),
        _ => {
            return Err(malformed(
                &path,
                header_line,
                "header must be \"particle_count total_snapshots\"",
            ))
        }
    };

    let mut snapshots = Vec::with_capacity(total);
    for _ in 0..total {
        let (line, content) = lines
            .next()
            .ok_or_else(|| malformed(&path, 0, "file ended before all snapshots were read"))?;
        let time = parse_f64(&path, line, content)?;
        let mut positions = Vec::with_capacity(particles);
        for _ in 0..particles {
            let (line, content) = lines
                .next()
                .ok_or_else(|| malformed(&path, 0, "snapshot truncated"))?;
            positions.push(parse_pair(&path, line, content)?);
        }
        snapshots.push(Snapshot { time, positions });
    }
    Ok(snapshots)
}

/// Everything an engine run left in its output directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutputs {
    /// Directory the artefacts were read from.
    pub dir: PathBuf,
    /// Echoed configuration.
    pub config: ConfigEcho,
    /// Discharge timestamps.
    pub discharges: Vec<f64>,
    /// Obstacle centres when the engine wrote them.
    pub obstacles: Option<Vec<(f64, f64)>>,
    /// Trajectory snapshots when the engine wrote them.
    pub snapshots: Option<Vec<Snapshot>>,
}

/// Loads all artefacts of a trial directory; the optional ones are `None`
/// when absent.
pub fn read_trial_outputs(dir: &Path) -> Result<TrialOutputs, FlowError> {
    let optional = |name: &str| dir.join(name).is_file();
    Ok(TrialOutputs {
        dir: dir.to_path_buf(),
        config: read_config_echo(dir)?,
        discharges: read_discharges(dir)?,
        obstacles: if optional(OBSTACLES_FILE) {
            Some(read_obstacles(dir)?)
        } else {
            None
        },
        snapshots: if optional(SNAPSHOTS_FILE) {
            Some(read_snapshots(dir)?)
        } else {
            None
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).expect("write fixture");
    }

    #[test]
    fn discharges_skip_header() {
        let temp = tempfile::tempdir().expect("tmp dir");
        write(temp.path(), DISCHARGES_FILE, "3\n1.5\n2.25\n7.00000\n");
        let times = read_discharges(temp.path()).expect("read");
        assert_eq!(times, vec![1.5, 2.25, 7.0]);
    }

    #[test]
    fn discharges_may_be_empty() {
        let temp = tempfile::tempdir().expect("tmp dir");
        write(temp.path(), DISCHARGES_FILE, "0\n");
        assert!(read_discharges(temp.path()).expect("read").is_empty());
    }

    #[test]
    fn config_echo_accepts_optional_seed() {
        let temp = tempfile::tempdir().expect("tmp dir");
        let base = "40\n140\n80\n100\n1\n1\n1\n0.5\n250\n500\n0.001\n0.01\n10\n";
        write(temp.path(), CONFIG_FILE, base);
        let echo = read_config_echo(temp.path()).expect("13 fields");
        assert_eq!(echo.seed, None);
        assert_eq!(echo.max_time, 10.0);

        write(temp.path(), CONFIG_FILE, &format!("{base}1234\n"));
        let echo = read_config_echo(temp.path()).expect("14 fields");
        assert_eq!(echo.seed, Some(1234.0));

        write(temp.path(), CONFIG_FILE, "40\n140\n");
        let err = read_config_echo(temp.path()).expect_err("short");
        assert!(matches!(err, FlowError::Config(_)));
    }

    #[test]
    fn echoed_obstacle_count_must_be_integral() {
        let temp = tempfile::tempdir().expect("tmp dir");
        write(
            temp.path(),
            CONFIG_FILE,
            "40\n140\n80\n100\n1\n1\n1\n0.5\n250\n500\n0.001\n0.01\n10\n",
        );
        let config = read_config_echo(temp.path())
            .expect("echo")
            .trial_config()
            .expect("integral count");
        assert_eq!(config.obstacle_count, 80);
        assert_eq!(config.acceleration, 0.5);

        for bad in ["80.5", "-3", "1e12"] {
            write(
                temp.path(),
                CONFIG_FILE,
                &format!("40\n140\n{bad}\n100\n1\n1\n1\n0.5\n250\n500\n0.001\n0.01\n10\n"),
            );
            let err = read_config_echo(temp.path())
                .expect("echo")
                .trial_config()
                .expect_err("not a count");
            assert!(matches!(err, FlowError::Config(_)), "{bad}");
        }
    }

    #[test]
    fn snapshots_parse_blocks() {
        let temp = tempfile::tempdir().expect("tmp dir");
        write(
            temp.path(),
            SNAPSHOTS_FILE,
            "2 2\n0.01\n1.0 2.0\n3.0 4.0\n0.02\n1.5 2.5\n3.5 4.5\n",
        );
        let snapshots = read_snapshots(temp.path()).expect("read");
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].time, 0.02);
        assert_eq!(snapshots[1].positions[1], (3.5, 4.5));
    }

    #[test]
    fn truncated_snapshots_are_malformed() {
        let temp = tempfile::tempdir().expect("tmp dir");
        write(temp.path(), SNAPSHOTS_FILE, "2 1\n0.01\n1.0 2.0\n");
        assert!(matches!(
            read_snapshots(temp.path()),
            Err(FlowError::Config(_))
        ));
    }

    #[test]
    fn optional_outputs_are_skipped_when_absent() {
        let temp = tempfile::tempdir().expect("tmp dir");
        write(
            temp.path(),
            CONFIG_FILE,
            "40\n140\n80\n100\n1\n1\n1\n0.5\n250\n500\n0.001\n0.01\n10\n",
        );
        write(temp.path(), DISCHARGES_FILE, "1\n6.0\n");
        write(temp.path(), OBSTACLES_FILE, "1\n10.0 20.0\n");
        let outputs = read_trial_outputs(temp.path()).expect("read");
        assert_eq!(outputs.obstacles, Some(vec![(10.0, 20.0)]));
        assert!(outputs.snapshots.is_none());
    }
}
