// hexapod-core: config, errors, shared types, time and system ordering for the hexapod core.

pub mod config;
pub mod error;
pub mod time;
pub mod types;

use bevy::prelude::*;

use crate::config::HexapodConfig;
use crate::time::SimTime;

// ---------------------------------------------------------------------------
// HexapodSet
// ---------------------------------------------------------------------------

/// Ordered system sets for one simulation frame.
///
/// `Plan` advances body and gait, `Solve` runs standalone IK requests and
/// `Report` publishes diagnostics.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HexapodSet {
    Plan,
    Solve,
    Report,
}

// ---------------------------------------------------------------------------
// HexapodCorePlugin
// ---------------------------------------------------------------------------

/// Registers [`SimTime`], the default [`HexapodConfig`] and the
/// [`HexapodSet`] ordering in `Update`.
pub struct HexapodCorePlugin;

impl Plugin for HexapodCorePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimTime>()
            .init_resource::<HexapodConfig>()
            .configure_sets(
                Update,
                (HexapodSet::Plan, HexapodSet::Solve, HexapodSet::Report).chain(),
            );
    }
}

pub mod prelude {
    pub use crate::config::{
        BodyConfig, GaitConfig, HexapodConfig, JointLimitConfig, LegConfig, LegMount,
        LimitPolicy, MovementConfig, SolverChoice, SolverConfig,
    };
    pub use crate::error::{ConfigError, HexapodError};
    pub use crate::time::SimTime;
    pub use crate::types::{JointKind, TripodGroup, TripodGroups};
    pub use crate::{HexapodCorePlugin, HexapodSet};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_plugin_registers_resources() {
        let mut app = App::new();
        app.add_plugins(HexapodCorePlugin);
        app.finish();
        app.cleanup();
        app.update();

        assert!(app.world().get_resource::<SimTime>().is_some());
        assert!(app.world().get_resource::<HexapodConfig>().is_some());
    }
}
