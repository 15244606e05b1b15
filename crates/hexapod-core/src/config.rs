use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_8, PI};

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::TripodGroups;

/// Number of legs the tripod gait is defined for.
pub const LEG_COUNT: usize = 6;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_frame_dt() -> f32 {
    0.016
}
const fn default_body_size() -> [f32; 3] {
    [0.6, 0.2, 1.0]
}
const fn default_ground_height() -> f32 {
    0.5
}
const fn default_mount_inset() -> f32 {
    0.05
}
const fn default_coxa_length() -> f32 {
    0.15
}
const fn default_femur_length() -> f32 {
    0.45
}
const fn default_tibia_length() -> f32 {
    0.65
}
const fn default_stance_radius() -> f32 {
    0.6
}
const fn default_coxa_limits() -> JointLimitConfig {
    JointLimitConfig {
        min: -FRAC_PI_2,
        max: FRAC_PI_2,
    }
}
const fn default_femur_limits() -> JointLimitConfig {
    JointLimitConfig {
        min: -FRAC_PI_2,
        max: FRAC_PI_2,
    }
}
const fn default_tibia_limits() -> JointLimitConfig {
    JointLimitConfig { min: -PI, max: 0.0 }
}
const fn default_swing_duration() -> f32 {
    0.35
}
const fn default_step_height() -> f32 {
    0.2
}
const fn default_max_foot_distance() -> f32 {
    0.3
}
const fn default_walk_speed() -> f32 {
    0.6
}
const fn default_turn_speed() -> f32 {
    2.0
}
const fn default_arrival_threshold() -> f32 {
    0.1
}
const fn default_yaw_tolerance() -> f32 {
    FRAC_PI_8
}
const fn default_fabrik_tolerance() -> f32 {
    1e-4
}
const fn default_fabrik_max_iterations() -> u32 {
    32
}

/// `true` for finite values strictly above zero (rejects NaN).
fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

// ---------------------------------------------------------------------------
// HexapodConfig
// ---------------------------------------------------------------------------

/// Static robot description and tuning constants.
///
/// Every field has a serde default, so a TOML file only needs to list the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
pub struct HexapodConfig {
    /// Fixed frame delta used by the ECS plugin and the CLI (seconds).
    #[serde(default = "default_frame_dt")]
    pub frame_dt: f32,

    #[serde(default)]
    pub body: BodyConfig,

    #[serde(default)]
    pub leg: LegConfig,

    /// Explicit leg mounts. Empty means "derive six mounts from the body size".
    #[serde(default)]
    pub legs: Vec<LegMount>,

    #[serde(default)]
    pub gait: GaitConfig,

    #[serde(default)]
    pub movement: MovementConfig,

    #[serde(default)]
    pub solver: SolverConfig,
}

impl Default for HexapodConfig {
    fn default() -> Self {
        Self {
            frame_dt: default_frame_dt(),
            body: BodyConfig::default(),
            leg: LegConfig::default(),
            legs: Vec::new(),
            gait: GaitConfig::default(),
            movement: MovementConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl HexapodConfig {
    /// Validate configuration. Returns Err on the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !positive(self.frame_dt) {
            return Err(ConfigError::InvalidFrameDt(self.frame_dt));
        }
        if !positive(self.body.ground_height) {
            return Err(ConfigError::invalid("body.ground_height", "must be > 0"));
        }
        for (field, value) in [
            ("leg.coxa_length", self.leg.coxa_length),
            ("leg.femur_length", self.leg.femur_length),
            ("leg.tibia_length", self.leg.tibia_length),
            ("leg.stance_radius", self.leg.stance_radius),
            ("gait.swing_duration", self.gait.swing_duration),
            ("gait.max_foot_distance", self.gait.max_foot_distance),
            ("movement.walk_speed", self.movement.walk_speed),
            ("movement.turn_speed", self.movement.turn_speed),
        ] {
            if !positive(value) {
                return Err(ConfigError::invalid(field, format!("must be > 0, got {value}")));
            }
        }
        if self.gait.step_height < 0.0 {
            return Err(ConfigError::invalid("gait.step_height", "must be non-negative"));
        }
        if self.movement.arrival_threshold < 0.0 {
            return Err(ConfigError::invalid(
                "movement.arrival_threshold",
                "must be non-negative",
            ));
        }
        if !positive(self.movement.yaw_tolerance) || self.movement.yaw_tolerance > PI {
            return Err(ConfigError::invalid(
                "movement.yaw_tolerance",
                "must be in (0, pi]",
            ));
        }
        for (field, limits) in [
            ("leg.coxa_limits", self.leg.coxa_limits),
            ("leg.femur_limits", self.leg.femur_limits),
            ("leg.tibia_limits", self.leg.tibia_limits),
        ] {
            if limits.min > limits.max {
                return Err(ConfigError::invalid(
                    field,
                    format!("min {} exceeds max {}", limits.min, limits.max),
                ));
            }
        }
        if !self.legs.is_empty() && self.legs.len() != LEG_COUNT {
            return Err(ConfigError::LegCount {
                expected: LEG_COUNT,
                got: self.legs.len(),
            });
        }
        self.validate_groups()?;
        if !positive(self.solver.tolerance) {
            return Err(ConfigError::invalid("solver.tolerance", "must be > 0"));
        }
        if self.solver.max_iterations == 0 {
            return Err(ConfigError::invalid("solver.max_iterations", "must be >= 1"));
        }
        Ok(())
    }

    fn validate_groups(&self) -> Result<(), ConfigError> {
        let mut seen = [false; LEG_COUNT];
        for leg in self.gait.groups.0.iter().flatten().copied() {
            if leg >= LEG_COUNT {
                return Err(ConfigError::InvalidGroups {
                    legs: LEG_COUNT,
                    message: format!("leg {leg} does not exist"),
                });
            }
            if seen[leg] {
                return Err(ConfigError::InvalidGroups {
                    legs: LEG_COUNT,
                    message: format!("leg {leg} listed twice"),
                });
            }
            seen[leg] = true;
        }
        Ok(())
    }

    /// Leg mounts, either the explicit list or six derived from the body box.
    pub fn mounts(&self) -> Vec<LegMount> {
        if self.legs.is_empty() {
            LegMount::derived(&self.body)
        } else {
            self.legs.clone()
        }
    }

    /// Resting foot position of `leg` in the body frame (vertical = 0).
    ///
    /// The foot rests `stance_radius` out from the mount along the mount's
    /// outward heading.
    pub fn rest_foot_position(&self, leg: usize) -> [f32; 3] {
        let mounts = self.mounts();
        let mount = mounts[leg];
        let (sin, cos) = mount.yaw.sin_cos();
        [
            mount.position[0] + sin * self.leg.stance_radius,
            0.0,
            mount.position[2] + cos * self.leg.stance_radius,
        ]
    }

    /// Load from TOML file and validate.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse from a TOML string and validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// BodyConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyConfig {
    /// Body box extents [width (x), height (y), length (z)].
    #[serde(default = "default_body_size")]
    pub size: [f32; 3],
    /// Height of the body root above the ground plane.
    #[serde(default = "default_ground_height")]
    pub ground_height: f32,
    /// World height of the ground plane.
    #[serde(default)]
    pub ground_level: f32,
    /// Distance of derived leg mounts from the body box edges.
    #[serde(default = "default_mount_inset")]
    pub mount_inset: f32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            size: default_body_size(),
            ground_height: default_ground_height(),
            ground_level: 0.0,
            mount_inset: default_mount_inset(),
        }
    }
}

// ---------------------------------------------------------------------------
// LegConfig
// ---------------------------------------------------------------------------

/// Inclusive angle range of one joint (radians).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimitConfig {
    pub min: f32,
    pub max: f32,
}

impl JointLimitConfig {
    pub fn clamp(&self, angle: f32) -> f32 {
        angle.clamp(self.min, self.max)
    }
}

/// Whether solved joint angles are clamped to their limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitPolicy {
    /// Apply the solved angles as-is.
    #[default]
    Ignore,
    /// Clamp each solved angle into its joint's limits.
    Clamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegConfig {
    /// Horizontal distance from the coxa pivot to the femur pivot.
    #[serde(default = "default_coxa_length")]
    pub coxa_length: f32,
    #[serde(default = "default_femur_length")]
    pub femur_length: f32,
    #[serde(default = "default_tibia_length")]
    pub tibia_length: f32,
    /// Horizontal distance from the leg mount to the resting foot.
    #[serde(default = "default_stance_radius")]
    pub stance_radius: f32,
    #[serde(default = "default_coxa_limits")]
    pub coxa_limits: JointLimitConfig,
    #[serde(default = "default_femur_limits")]
    pub femur_limits: JointLimitConfig,
    #[serde(default = "default_tibia_limits")]
    pub tibia_limits: JointLimitConfig,
    #[serde(default)]
    pub limit_policy: LimitPolicy,
}

impl Default for LegConfig {
    fn default() -> Self {
        Self {
            coxa_length: default_coxa_length(),
            femur_length: default_femur_length(),
            tibia_length: default_tibia_length(),
            stance_radius: default_stance_radius(),
            coxa_limits: default_coxa_limits(),
            femur_limits: default_femur_limits(),
            tibia_limits: default_tibia_limits(),
            limit_policy: LimitPolicy::default(),
        }
    }
}

impl LegConfig {
    /// Maximum distance the femur/tibia pair can reach from the femur pivot.
    pub fn max_reach(&self) -> f32 {
        self.femur_length + self.tibia_length
    }
}

// ---------------------------------------------------------------------------
// LegMount
// ---------------------------------------------------------------------------

/// Placement of one leg root on the body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegMount {
    /// Position in the body frame.
    pub position: [f32; 3],
    /// Heading of the leg's forward (+z) axis about the body's vertical axis.
    pub yaw: f32,
}

impl LegMount {
    /// Six mounts at the corners and side midpoints of the body box.
    ///
    /// Order: right front, right middle, right rear, left front, left middle,
    /// left rear. Corner legs splay 45 degrees toward their end of the body.
    pub fn derived(body: &BodyConfig) -> Vec<Self> {
        let x = body.size[0] / 2.0 - body.mount_inset;
        let z = body.size[2] / 2.0 - body.mount_inset;
        let layout = [
            ([x, 0.0, z], FRAC_PI_4),
            ([x, 0.0, 0.0], FRAC_PI_2),
            ([x, 0.0, -z], FRAC_PI_2 + FRAC_PI_4),
            ([-x, 0.0, z], -FRAC_PI_4),
            ([-x, 0.0, 0.0], -FRAC_PI_2),
            ([-x, 0.0, -z], -FRAC_PI_2 - FRAC_PI_4),
        ];
        layout
            .into_iter()
            .map(|(position, yaw)| Self { position, yaw })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// GaitConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitConfig {
    /// Seconds a swing takes from liftoff to touchdown.
    #[serde(default = "default_swing_duration")]
    pub swing_duration: f32,
    /// Apex height of the parabolic swing arc.
    #[serde(default = "default_step_height")]
    pub step_height: f32,
    /// Horizontal foot-to-target distance that triggers a step.
    #[serde(default = "default_max_foot_distance")]
    pub max_foot_distance: f32,
    #[serde(default)]
    pub groups: TripodGroups,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            swing_duration: default_swing_duration(),
            step_height: default_step_height(),
            max_foot_distance: default_max_foot_distance(),
            groups: TripodGroups::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// MovementConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Body translation speed (units per second).
    #[serde(default = "default_walk_speed")]
    pub walk_speed: f32,
    /// Body yaw rate (radians per second).
    #[serde(default = "default_turn_speed")]
    pub turn_speed: f32,
    /// Horizontal distance at which the body counts as arrived.
    #[serde(default = "default_arrival_threshold")]
    pub arrival_threshold: f32,
    /// Yaw error below which the body starts translating.
    #[serde(default = "default_yaw_tolerance")]
    pub yaw_tolerance: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            walk_speed: default_walk_speed(),
            turn_speed: default_turn_speed(),
            arrival_threshold: default_arrival_threshold(),
            yaw_tolerance: default_yaw_tolerance(),
        }
    }
}

// ---------------------------------------------------------------------------
// SolverConfig
// ---------------------------------------------------------------------------

/// Which leg IK strategy a chain uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverChoice {
    /// Closed-form coxa yaw plus law-of-cosines knee.
    #[default]
    Analytic,
    /// Coxa yaw plus iterative FABRIK on the femur/tibia pair.
    Fabrik,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub kind: SolverChoice,
    /// FABRIK end-effector tolerance.
    #[serde(default = "default_fabrik_tolerance")]
    pub tolerance: f32,
    /// FABRIK pass cap.
    #[serde(default = "default_fabrik_max_iterations")]
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            kind: SolverChoice::default(),
            tolerance: default_fabrik_tolerance(),
            max_iterations: default_fabrik_max_iterations(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
