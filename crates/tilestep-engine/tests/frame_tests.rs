//! Frame settle: tile dispatch, halted bodies, automatic facing and
//! diagnostics.

use std::cell::RefCell;
use std::rc::Rc;

use tilestep_engine::prelude::*;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    World(EntityId, TileKind),
    Local(&'static str, TileKind),
}

type Log = Rc<RefCell<Vec<Event>>>;

fn world_logger(log: &Log) -> impl FnMut(EntityId, TileKind) {
    let log = Rc::clone(log);
    move |id, kind| log.borrow_mut().push(Event::World(id, kind))
}

fn listen(stage: &mut Stage<TileGrid>, id: EntityId, tag: &'static str, log: &Log) -> ListenerId {
    let log = Rc::clone(log);
    stage
        .body_mut(id)
        .unwrap()
        .add_tile_listener(move |kind| log.borrow_mut().push(Event::Local(tag, kind)))
}

#[test]
fn world_handler_runs_before_listeners_for_each_category() {
    let mut grid = TileGrid::filled(30, 30, TileKind::Hollow);
    grid.set(3, 1, TileKind::Lethal);
    let trigger = AreaTrigger::new(4).unwrap();
    grid.set(1, 3, TileKind::AreaTrigger(trigger));
    let mut stage = Stage::new(grid, StageConfig::default());
    let id = stage.spawn(Rect::new(0.0, 0.0, 6.0, 6.0));
    stage.body_mut(id).unwrap().set_triggerable(true);

    let log: Log = Rc::default();
    listen(&mut stage, id, "a", &log);
    listen(&mut stage, id, "b", &log);
    let mut handler = world_logger(&log);
    stage.step_frame(&mut handler);

    let area = TileKind::AreaTrigger(trigger);
    assert_eq!(
        *log.borrow(),
        vec![
            Event::World(id, TileKind::Hollow),
            Event::Local("a", TileKind::Hollow),
            Event::Local("b", TileKind::Hollow),
            Event::World(id, TileKind::Lethal),
            Event::Local("a", TileKind::Lethal),
            Event::Local("b", TileKind::Lethal),
            Event::World(id, area),
            Event::Local("a", area),
            Event::Local("b", area),
        ]
    );
}

#[test]
fn centre_of_a_three_by_three_box_is_never_reported() {
    let mut grid = TileGrid::filled(10, 10, TileKind::Hollow);
    // Box (0, 0, 4, 4) samples the ring of cells 1..=3; cell (2, 2) sits in its middle.
    grid.set(2, 2, TileKind::Lethal);
    let mut stage = Stage::new(grid, StageConfig::default());
    let id = stage.spawn(Rect::new(0.0, 0.0, 4.0, 4.0));
    stage.body_mut(id).unwrap().set_triggerable(true);

    let mut seen = Vec::new();
    stage.step_frame(&mut |_: EntityId, kind: TileKind| seen.push(kind));
    assert_eq!(seen, vec![TileKind::Hollow]);
    assert_eq!(stage.body(id).unwrap().occupied().len(), 1);
}

#[test]
fn only_triggerable_live_bodies_are_sampled() {
    let grid = TileGrid::filled(50, 50, TileKind::Hollow);
    let mut stage = Stage::new(grid, StageConfig::default());
    let plain = stage.spawn(Rect::new(0.0, 0.0, 5.0, 5.0));
    let active = stage.spawn(Rect::new(10.0, 0.0, 5.0, 5.0));
    let halted = stage.spawn(Rect::new(20.0, 0.0, 5.0, 5.0));
    stage.body_mut(active).unwrap().set_triggerable(true);
    stage.body_mut(halted).unwrap().set_triggerable(true);
    stage.body_mut(halted).unwrap().halt(true);

    let mut touched_by = Vec::new();
    let report = stage
        .step_frame(&mut |id: EntityId, _: TileKind| touched_by.push(id))
        .clone();

    assert_eq!(touched_by, vec![active]);
    assert_eq!(report.bodies, 3);
    assert_eq!(report.bodies_sampled, 1);
    assert_eq!(report.tile_events, 1);
    assert!(stage.body(plain).unwrap().occupied().is_empty());
}

#[test]
fn removing_without_target_drops_the_oldest_listener() {
    let mut grid = TileGrid::filled(20, 20, TileKind::Hollow);
    grid.set(2, 1, TileKind::Goal);
    let mut stage = Stage::new(grid, StageConfig::default());
    let id = stage.spawn(Rect::new(0.0, 0.0, 5.0, 5.0));
    stage.body_mut(id).unwrap().set_triggerable(true);

    let log: Log = Rc::default();
    listen(&mut stage, id, "old", &log);
    listen(&mut stage, id, "new", &log);
    assert!(stage.body_mut(id).unwrap().remove_tile_listener(None));

    stage.step_frame(&mut IgnoreTiles);
    let tags: Vec<_> = log
        .borrow()
        .iter()
        .map(|event| match event {
            Event::Local(tag, _) => *tag,
            Event::World(..) => "world",
        })
        .collect();
    assert_eq!(tags, vec!["new", "new"]);
}

#[test]
fn halted_body_ignores_pushes_but_keeps_config() {
    let mut stage = Stage::new(TileGrid::filled(80, 80, TileKind::Hollow), StageConfig::default());
    let boulder = stage.spawn(Rect::new(30.0, 30.0, 10.0, 10.0));
    let pusher = stage.spawn(Rect::new(22.0, 32.0, 10.0, 6.0));
    stage.body_mut(boulder).unwrap().freeze();
    stage.body_mut(boulder).unwrap().halt(true);
    assert_eq!(stage.body(boulder).unwrap().motion_state(), MotionState::Halted);

    stage.push_apart(pusher, boulder).unwrap();
    stage.step_frame(&mut IgnoreTiles);
    assert_eq!(stage.body(boulder).unwrap().position(), (30.0, 30.0));

    stage.body_mut(boulder).unwrap().halt(false);
    assert_eq!(stage.body(boulder).unwrap().motion_state(), MotionState::Frozen);
}

#[test]
fn snap_back_can_be_disabled() {
    let config = StageConfig {
        snap_back_halted: false,
        ..StageConfig::default()
    };
    let mut stage = Stage::new(TileGrid::filled(80, 80, TileKind::Hollow), config);
    let id = stage.spawn(Rect::new(30.0, 30.0, 10.0, 10.0));
    stage.body_mut(id).unwrap().halt(true);
    stage.body_mut(id).unwrap().set_position(31.0, 30.0);

    let report = stage.step_frame(&mut IgnoreTiles).clone();
    assert_eq!(report.halted_snapped, 0);
    assert_eq!(stage.body(id).unwrap().position(), (31.0, 30.0));
}

#[test]
fn double_faced_body_never_faces_north_or_south() {
    let mut stage = Stage::new(TileGrid::filled(80, 80, TileKind::Hollow), StageConfig::default());
    let id = stage.spawn(Rect::new(40.0, 40.0, 8.0, 8.0));
    stage.body_mut(id).unwrap().set_double_faced(true, false).unwrap();

    stage.try_step(id, Step::Left, 2).unwrap();
    stage.step_frame(&mut IgnoreTiles);
    assert_eq!(stage.body(id).unwrap().facing(), Direction::W);

    stage.try_step(id, Step::Up, 3).unwrap();
    stage.step_frame(&mut IgnoreTiles);
    assert_eq!(stage.body(id).unwrap().facing(), Direction::W);
    let choice = stage.frame_for(id, 8, 1).unwrap();
    assert_eq!(choice.index, 5);

    stage.move_toward(id, 60.0, 20.0, None).unwrap();
    stage.step_frame(&mut IgnoreTiles);
    assert_eq!(stage.body(id).unwrap().facing(), Direction::NE);
    assert_eq!(stage.frame_for(id, 8, 1).unwrap().index, 1);
}

#[test]
fn eight_way_body_faces_every_compass_point() {
    let mut stage = Stage::new(TileGrid::filled(80, 80, TileKind::Hollow), StageConfig::default());
    let id = stage.spawn(Rect::new(40.0, 40.0, 4.0, 4.0));
    stage.body_mut(id).unwrap().set_eight_way(true).unwrap();

    let moves = [
        (0.0, -1.0, Direction::N),
        (1.0, -1.0, Direction::NE),
        (1.0, 0.0, Direction::E),
        (1.0, 1.0, Direction::SE),
        (0.0, 1.0, Direction::S),
        (-1.0, 1.0, Direction::SW),
        (-1.0, 0.0, Direction::W),
        (-1.0, -1.0, Direction::NW),
    ];
    for (block, (dx, dy, expected)) in moves.into_iter().enumerate() {
        let (x, y) = stage.body(id).unwrap().position();
        stage.body_mut(id).unwrap().set_position(x + dx, y + dy);
        stage.step_frame(&mut IgnoreTiles);
        assert_eq!(stage.body(id).unwrap().facing(), expected);
        assert_eq!(stage.frame_for(id, 16, 1).unwrap().index, block * 2 + 1);
    }
}

#[test]
fn manual_facing_is_left_alone() {
    let mut stage = Stage::new(TileGrid::filled(80, 80, TileKind::Hollow), StageConfig::default());
    let id = stage.spawn(Rect::new(40.0, 40.0, 4.0, 4.0));
    {
        let body = stage.body_mut(id).unwrap();
        body.set_manual_facing(true);
        body.set_facing(Direction::S);
    }
    stage.try_step(id, Step::Right, 4).unwrap();
    stage.step_frame(&mut IgnoreTiles);
    assert_eq!(stage.body(id).unwrap().facing(), Direction::S);
}

#[test]
fn frame_counter_and_previous_positions_advance() {
    let mut stage = Stage::new(TileGrid::filled(80, 80, TileKind::Hollow), StageConfig::default());
    let id = stage.spawn(Rect::new(10.0, 10.0, 4.0, 4.0));

    for frame in 1..=5u64 {
        stage.try_step(id, Step::Down, 1).unwrap();
        assert!(stage.body(id).unwrap().is_moving());
        let report = stage.step_frame(&mut IgnoreTiles);
        assert_eq!(report.frame, frame);
        assert!(!stage.body(id).unwrap().is_moving());
    }
    assert_eq!(stage.frame_count(), 5);
    assert_eq!(stage.body(id).unwrap().prev_position(), (10.0, 15.0));
    assert_eq!(stage.last_diagnostics().frame, 5);
}

#[test]
fn runaway_position_does_not_break_the_frame() {
    let mut stage = Stage::new(TileGrid::filled(20, 20, TileKind::Hollow), StageConfig::default());
    let id = stage.spawn(Rect::new(2.0, 2.0, 4.0, 4.0));
    stage.body_mut(id).unwrap().set_triggerable(true);

    stage.move_toward(id, 5.0, 1.0, Some(f32::INFINITY)).unwrap();
    let (x, _) = stage.body(id).unwrap().position();
    assert!(!x.is_finite());

    let mut seen = Vec::new();
    let report = stage.step_frame(&mut |_: EntityId, kind: TileKind| seen.push(kind)).clone();
    assert!(seen.is_empty());
    assert_eq!(report.tile_events, 0);
    assert_eq!(stage.frame_count(), 1);
}
