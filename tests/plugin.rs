//! Integration tests for the locomotion plugin.
//!
//! These run the full `FixedUpdate` chain against a [`PlaneWorld`] resource.

use bevy::prelude::*;
use fps_locomotion::prelude::*;

/// Create a minimal test app with a plane world and the locomotion plugin.
fn create_test_app(world: PlaneWorld) -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.insert_resource(world);
    app.add_plugins(LocomotionPlugin::<ResourceWorldBackend<PlaneWorld>>::default());
    app.insert_resource(Time::<Fixed>::from_hz(60.0));

    app.finish();
    app.cleanup();
    app
}

fn spawn_actor(app: &mut App, position: Vec3, config: LocomotionConfig) -> Entity {
    app.world_mut()
        .spawn((Transform::from_translation(position), LocomotionBundle::new(config)))
        .id()
}

/// Run the fixed schedule once.
fn tick(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}

fn run_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        tick(app);
    }
}

fn set_intent(app: &mut App, entity: Entity, f: impl FnOnce(&mut LocomotionIntent)) {
    let mut entity = app.world_mut().entity_mut(entity);
    let mut intent = entity
        .get_mut::<LocomotionIntent>()
        .expect("actor has an intent");
    f(&mut intent);
}

fn feet(app: &App, entity: Entity) -> Vec3 {
    app.world().get::<Transform>(entity).unwrap().translation
}

fn state(app: &App, entity: Entity) -> &ActorKinematicState {
    app.world().get::<ActorKinematicState>(entity).unwrap()
}

// ==================== Ground Tests ====================

#[test]
fn actor_falls_lands_and_is_grounded() {
    let mut app = create_test_app(PlaneWorld::new().with_floor(Floor::flat(0.0)));
    let actor = spawn_actor(&mut app, Vec3::new(0.0, 2.0, 0.0), LocomotionConfig::default());

    tick(&mut app);
    assert!(app.world().get::<Airborne>(actor).is_some());
    assert!(feet(&app, actor).y < 2.0);

    run_ticks(&mut app, 60);
    assert!(feet(&app, actor).y.abs() < 1e-4);
    assert!(state(&app, actor).is_grounded);
    assert!(app.world().get::<Grounded>(actor).is_some());
    assert!(app.world().get::<Airborne>(actor).is_none());
}

#[test]
fn walk_intent_moves_actor_forward() {
    let mut app = create_test_app(PlaneWorld::new().with_floor(Floor::flat(0.0)));
    let actor = spawn_actor(&mut app, Vec3::ZERO, LocomotionConfig::default());
    tick(&mut app);

    set_intent(&mut app, actor, |intent| intent.set_move(Vec2::Y));
    run_ticks(&mut app, 60);

    let position = feet(&app, actor);
    assert!(position.z < -3.0, "actor only reached {position:?}");
    assert!(position.x.abs() < 1e-4);

    let output = app.world().get::<LocomotionOutput>(actor).unwrap();
    assert!(output.applied_displacement.z < 0.0);
}

#[test]
fn held_jump_fires_once() {
    let mut app = create_test_app(PlaneWorld::new().with_floor(Floor::flat(0.0)));
    let actor = spawn_actor(&mut app, Vec3::ZERO, LocomotionConfig::default());
    tick(&mut app);

    set_intent(&mut app, actor, |intent| intent.set_jump_held(true));
    tick(&mut app);
    assert!(app.world().get::<LocomotionOutput>(actor).unwrap().jumped);

    // Still holding: land and stay down
    run_ticks(&mut app, 120);
    assert!(state(&app, actor).is_grounded);
    assert!(!app.world().get::<LocomotionOutput>(actor).unwrap().jumped);
}

// ==================== Marker Tests ====================

#[test]
fn crouch_and_slide_markers_follow_state() {
    let mut app = create_test_app(PlaneWorld::new().with_floor(Floor::flat(0.0)));
    let actor = spawn_actor(&mut app, Vec3::ZERO, LocomotionConfig::default());

    set_intent(&mut app, actor, |intent| {
        intent.set_move(Vec2::Y);
        intent.set_sprint_held(true);
    });
    run_ticks(&mut app, 60);
    assert!(state(&app, actor).planar_speed() > 7.9);

    set_intent(&mut app, actor, |intent| intent.set_crouch_held(true));
    tick(&mut app);
    tick(&mut app);
    assert!(app.world().get::<Crouching>(actor).is_some());
    assert!(app.world().get::<Sliding>(actor).is_some());

    set_intent(&mut app, actor, |intent| intent.set_crouch_held(false));
    run_ticks(&mut app, 2);
    assert!(app.world().get::<Crouching>(actor).is_none());
    assert!(app.world().get::<Sliding>(actor).is_none());
}

#[test]
fn wall_running_marker_carries_wall() {
    let world = PlaneWorld::new()
        .with_floor(Floor::flat(-50.0))
        .with_wall(WallPlane::new(Vec3::NEG_X, Vec3::new(0.6, 0.0, 0.0)));
    let mut app = create_test_app(world);
    let mut config = LocomotionConfig::default();
    config.wall_run_max_time = 0.0;
    let actor = spawn_actor(&mut app, Vec3::new(0.0, 5.0, 0.0), config);

    app.world_mut()
        .get_mut::<ActorKinematicState>(actor)
        .unwrap()
        .planar_velocity = Vec3::new(0.0, 0.0, -6.0);
    tick(&mut app);
    let output = app.world().get::<LocomotionOutput>(actor).unwrap();
    assert!(output.wall_run_started);
    assert_eq!(output.wall_run_exit, None);

    run_ticks(&mut app, 2);
    assert!(!app.world().get::<LocomotionOutput>(actor).unwrap().wall_run_started);

    let wall = app.world().get::<WallRunning>(actor).expect("wallrunning");
    assert!(wall.normal.abs_diff_eq(Vec3::NEG_X, 1e-4));
    assert!(wall.is_right_of(Vec3::X));
    assert!(app.world().get::<Airborne>(actor).is_some());
}

// ==================== Camera Tests ====================

#[test]
fn first_person_camera_follows_look() {
    let mut app = create_test_app(PlaneWorld::new().with_floor(Floor::flat(0.0)));
    let look = CameraLook {
        yaw: 45.0,
        pitch: 10.0,
        ..default()
    };
    let actor = app
        .world_mut()
        .spawn((
            Transform::default(),
            LocomotionBundle::new(LocomotionConfig::default()),
            look,
        ))
        .id();
    let camera = app
        .world_mut()
        .spawn((FirstPersonCamera::new(1.7), Transform::default(), ChildOf(actor)))
        .id();

    app.update();

    let body = app.world().get::<Transform>(actor).unwrap();
    assert!(body.rotation.angle_between(look.body_rotation()) < 1e-4);
    let head = app.world().get::<Transform>(camera).unwrap();
    assert!((head.translation.y - 1.7).abs() < 1e-4);
    assert!(head.rotation.angle_between(look.head_rotation()) < 1e-4);
}

#[test]
fn invalid_config_still_simulates() {
    let mut app = create_test_app(PlaneWorld::new().with_floor(Floor::flat(0.0)));
    let config = LocomotionConfig::default().with_crouch(3.0, 6.0);
    assert!(config.validate().is_err());
    let actor = spawn_actor(&mut app, Vec3::new(0.0, 1.0, 0.0), config);

    app.update();
    run_ticks(&mut app, 30);
    assert!(feet(&app, actor).y < 1.0);
}

#[test]
fn wall_run_exit_reason_reaches_output() {
    let world = PlaneWorld::new()
        .with_floor(Floor::flat(-50.0))
        .with_wall(WallPlane::new(Vec3::NEG_X, Vec3::new(0.6, 0.0, 0.0)));
    let mut app = create_test_app(world);
    let config = LocomotionConfig::default().with_wall_run_timing(0.05, 0.15);
    let actor = spawn_actor(&mut app, Vec3::new(0.0, 5.0, 0.0), config);
    app.world_mut()
        .get_mut::<ActorKinematicState>(actor)
        .unwrap()
        .planar_velocity = Vec3::new(0.0, 0.0, -6.0);

    let mut exit = None;
    for _ in 0..10 {
        tick(&mut app);
        exit = exit.or(app.world().get::<LocomotionOutput>(actor).unwrap().wall_run_exit);
    }
    assert_eq!(exit, Some(WallRunExit::Timeout));
}
