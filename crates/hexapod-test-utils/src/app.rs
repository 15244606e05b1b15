//! Bevy test app builders with various plugin combinations.

use bevy::prelude::*;
use hexapod_core::config::HexapodConfig;

/// Create a minimal test app with only the core plugin.
///
/// Provides `HexapodSet` ordering, `SimTime` and the default config, but no
/// robot.
pub fn minimal_test_app() -> App {
    let mut app = App::new();
    app.add_plugins(hexapod_core::HexapodCorePlugin);
    app.finish();
    app.cleanup();
    app
}

/// Create an app running a full robot built from `config`.
pub fn sim_test_app(config: HexapodConfig) -> App {
    let mut app = App::new();
    app.add_plugins(hexapod_sim::HexapodSimPlugin);
    app.insert_resource(config);
    app.finish();
    app.cleanup();
    app
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use hexapod_sim::HexapodRobot;

    #[test]
    fn minimal_app_builds() {
        let app = minimal_test_app();
        assert!(
            app.world()
                .get_resource::<hexapod_core::time::SimTime>()
                .is_some()
        );
        assert!(app.world().get_resource::<HexapodRobot>().is_none());
    }

    #[test]
    fn sim_app_uses_given_config() {
        let mut config = HexapodConfig::default();
        config.body.ground_height = 0.6;
        let mut app = sim_test_app(config);
        app.update();
        app.update();

        let robot = &app.world().resource::<HexapodRobot>().0;
        assert!((robot.body_pose().position[1] - 0.6).abs() < 1e-6);
    }
}
