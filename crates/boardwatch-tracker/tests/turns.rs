use boardwatch_core::{Point2, RgbImage};
use boardwatch_tracker::{
    BoardModel, BoardTrackingSession, Camera, Piece, Pieces, SessionError, Side, Square,
    TrackerParams,
};
use parking_lot::Mutex;
use std::sync::Arc;

const FRAME_W: usize = 640;
const FRAME_H: usize = 480;
const BOARD_X: usize = 120;
const BOARD_Y: usize = 40;
const CELL: usize = 50;

const LIGHT: [u8; 3] = [220, 200, 160];
const DARK: [u8; 3] = [120, 85, 55];
const WHITE_PIECE: [u8; 3] = [200, 60, 60];
const BLACK_PIECE: [u8; 3] = [40, 60, 160];
const MARKER: [u8; 3] = [20, 200, 40];

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn board_corners() -> [(usize, usize); 4] {
    let s = 8 * CELL;
    [
        (BOARD_X, BOARD_Y),
        (BOARD_X + s, BOARD_Y),
        (BOARD_X + s, BOARD_Y + s),
        (BOARD_X, BOARD_Y + s),
    ]
}

/// Top-down scene: checkered board, one colored block per piece, optional corner markers.
fn render(pieces: &Pieces, markers: bool) -> RgbImage {
    let mut img = RgbImage::filled(FRAME_W, FRAME_H, [70, 70, 75]);
    for sq in Square::all() {
        let x0 = BOARD_X + sq.col * CELL;
        let y0 = BOARD_Y + sq.row * CELL;
        let bg = if (sq.row + sq.col) % 2 == 0 { LIGHT } else { DARK };
        img.fill_rect(x0, y0, x0 + CELL, y0 + CELL, bg);
        if let Some(p) = pieces[sq.row][sq.col] {
            let c = match p.side {
                Side::White => WHITE_PIECE,
                Side::Black => BLACK_PIECE,
            };
            img.fill_rect(x0 + 12, y0 + 12, x0 + CELL - 12, y0 + CELL - 12, c);
        }
    }
    if markers {
        for (cx, cy) in board_corners() {
            img.fill_rect(cx - 7, cy - 7, cx + 7, cy + 7, MARKER);
        }
    }
    img
}

struct Scene {
    pieces: Arc<Mutex<Pieces>>,
}

impl Scene {
    fn standard() -> Self {
        Self {
            pieces: Arc::new(Mutex::new(BoardModel::standard().pieces)),
        }
    }

    fn camera(&self, markers: bool) -> Camera<impl FnMut() -> Option<RgbImage>> {
        let pieces = Arc::clone(&self.pieces);
        Camera::new(move || Some(render(&pieces.lock(), markers)))
    }

    fn play(&self, from: &str, to: &str) {
        let (from, to) = (sq(from), sq(to));
        let mut pieces = self.pieces.lock();
        pieces[to.row][to.col] = pieces[from.row][from.col].take();
    }
}

fn sq(name: &str) -> Square {
    Square::from_algebraic(name).expect("square")
}

fn params() -> TrackerParams {
    let mut p = TrackerParams::default();
    p.sampler.frames = 5;
    p.sampler.frame_delay_ms = 0;
    p
}

fn code_at(session: &BoardTrackingSession, name: &str) -> Option<String> {
    session.board().piece_at(sq(name)).map(|p: Piece| p.code())
}

#[test]
fn markers_track_an_opening_across_restarts() {
    init_logger();
    let dir = tempfile::tempdir().expect("tempdir");
    let scene = Scene::standard();
    let camera = scene.camera(true);

    let mut session = BoardTrackingSession::in_dir(dir.path(), params());
    session.new_game(&camera).expect("new game");
    assert!(session.board_quad().is_some());

    scene.play("e2", "e4");
    let outcome = session.complete_turn(&camera).expect("white turn");
    assert_eq!(outcome.mover, Side::White);
    assert_eq!((outcome.resolved.src, outcome.resolved.dst), (sq("e2"), sq("e4")));
    assert_eq!(outcome.record.notation, "P e2-e4");
    assert!(outcome.report.is_significant(sq("e2")));
    assert!(outcome.report.is_significant(sq("e4")));
    assert_eq!(code_at(&session, "e4").as_deref(), Some("WP"));
    assert_eq!(code_at(&session, "e2"), None);
    assert_eq!(session.turn(), Side::Black);

    scene.play("e7", "e5");
    let outcome = session.complete_turn(&camera).expect("black turn");
    assert_eq!(outcome.record.notation, "p e7-e5");
    assert_eq!(outcome.resolved.uci(), "e7e5");

    let baseline = *session.baseline().expect("baseline");
    drop(session);

    let reopened = BoardTrackingSession::in_dir(dir.path(), params());
    assert_eq!(reopened.turn(), Side::White);
    assert_eq!(
        reopened.board().move_history,
        vec!["P e2-e4".to_string(), "p e7-e5".to_string()]
    );
    assert_eq!(code_at(&reopened, "e5").as_deref(), Some("BP"));
    let restored = reopened.baseline().expect("restored baseline");
    for s in Square::all() {
        for k in 0..3 {
            assert!((restored.get(s)[k] - baseline.get(s)[k]).abs() < 1e-4);
        }
    }
}

#[test]
fn manual_corners_replace_markers() {
    init_logger();
    let dir = tempfile::tempdir().expect("tempdir");
    let scene = Scene::standard();
    let camera = scene.camera(false);

    let mut session = BoardTrackingSession::in_dir(dir.path(), params());
    let pts: Vec<Point2<f32>> = board_corners()
        .iter()
        .rev()
        .map(|&(x, y)| Point2::new(x as f32, y as f32))
        .collect();
    session.set_manual_corners(&pts).expect("corners");
    session.new_game(&camera).expect("new game");

    scene.play("g1", "f3");
    let outcome = session.complete_turn(&camera).expect("turn");
    assert_eq!(outcome.record.notation, "N g1-f3");
    assert_eq!(outcome.frames, 5);
}

#[test]
fn unrectified_fallback_still_completes_a_turn() {
    init_logger();
    let dir = tempfile::tempdir().expect("tempdir");
    let scene = Scene::standard();
    let camera = scene.camera(false);

    let mut session = BoardTrackingSession::in_dir(dir.path(), params());
    session.set_reference(&camera).expect("reference");
    assert!(session.board_quad().is_none());

    scene.play("d2", "d4");
    let outcome = session.complete_turn(&camera).expect("degraded turn");
    assert_eq!(session.board().move_history.len(), 1);
    assert_eq!(session.turn(), Side::Black);
    assert_ne!(outcome.resolved.src, outcome.resolved.dst);
}

#[test]
fn dead_camera_fails_the_turn_without_committing() {
    init_logger();
    let dir = tempfile::tempdir().expect("tempdir");
    let scene = Scene::standard();
    let mut session = BoardTrackingSession::in_dir(dir.path(), params());
    session.set_reference(&scene.camera(true)).expect("reference");

    let dead = Camera::new(|| None::<RgbImage>);
    let err = session.complete_turn(&dead).unwrap_err();
    assert!(matches!(err, SessionError::CaptureFailed { requested: 5 }));
    assert_eq!(session.turn(), Side::White);
    assert!(session.board().move_history.is_empty());
}

#[test]
fn shared_session_serializes_transitions() {
    init_logger();
    let dir = tempfile::tempdir().expect("tempdir");
    let scene = Scene::standard();
    let camera = Arc::new(scene.camera(true));
    let shared = BoardTrackingSession::in_dir(dir.path(), params()).into_shared();
    shared.lock().new_game(&*camera).expect("new game");

    scene.play("c2", "c4");
    let worker = {
        let shared = Arc::clone(&shared);
        let camera = Arc::clone(&camera);
        std::thread::spawn(move || shared.lock().complete_turn(&*camera).map(|o| o.record))
    };
    let record = worker.join().expect("join").expect("turn");
    assert_eq!(record.notation, "P c2-c4");
    assert_eq!(shared.lock().turn(), Side::Black);
}
