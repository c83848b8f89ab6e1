//! boardwatch CLI: calibrate the camera view, capture references and record turns
//! from image files standing in for the overhead camera.

use boardwatch::frames::{load_rgb, save_rgb, FramesError, ImageSequenceSource};
use boardwatch::tracker::{detect_changes, resolve_move, ParamsError, BOARD_SIZE};
use boardwatch::{
    render_overlay, BoardTrackingSession, Camera, Point2, SessionError, Square, TrackerParams,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("config: {0}")]
    Params(#[from] ParamsError),
    #[error(transparent)]
    Frames(#[from] FramesError),
    #[error("invalid point {0:?}, expected X,Y")]
    BadPoint(String),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "boardwatch")]
#[command(about = "Track a physical chessboard from overhead camera frames")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Args)]
struct CommonArgs {
    /// Directory holding the baseline, board and corner files.
    #[arg(long, global = true, default_value = ".boardwatch")]
    state_dir: PathBuf,

    /// JSON tracker parameters; missing fields keep their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Store four board corners (any order) for the manual localizer.
    Calibrate {
        #[arg(value_name = "X,Y", num_args = 4, required = true)]
        points: Vec<String>,
    },

    /// Forget manual corners and go back to marker detection.
    Uncalibrate,

    /// Capture the baseline from one or more frames.
    Reference {
        /// Also reset the board to the starting position.
        #[arg(long)]
        new_game: bool,

        #[arg(required = true)]
        frames: Vec<PathBuf>,
    },

    /// Complete the current turn from frames showing the board after the move.
    Turn {
        #[arg(required = true)]
        frames: Vec<PathBuf>,
    },

    /// Print per-cell deviation from the baseline for one frame.
    Diff {
        frame: PathBuf,

        /// Write the rectified frame with the deviation overlay here.
        #[arg(long)]
        overlay: Option<PathBuf>,
    },

    /// Print the board, the side to move and the move log.
    Show,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.common.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "tracing")]
fn init_logging(_verbose: u8) {
    boardwatch::init_tracing(false);
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: u8) {
    use log::LevelFilter;
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = boardwatch::init_with_level(level);
}

fn run(cli: Cli) -> CliResult<()> {
    let mut session = open_session(&cli.common)?;

    match cli.command {
        Commands::Calibrate { points } => run_calibrate(&mut session, &points),
        Commands::Uncalibrate => {
            session.clear_manual_corners();
            println!("manual corners cleared");
            Ok(())
        }
        Commands::Reference { new_game, frames } => run_reference(&mut session, new_game, &frames),
        Commands::Turn { frames } => run_turn(&mut session, &frames),
        Commands::Diff { frame, overlay } => run_diff(&mut session, &frame, overlay.as_deref()),
        Commands::Show => {
            print_board(&session);
            Ok(())
        }
    }
}

fn open_session(common: &CommonArgs) -> CliResult<BoardTrackingSession> {
    let params = match &common.config {
        Some(path) => TrackerParams::load_json(path)?,
        None => TrackerParams::default(),
    };
    Ok(BoardTrackingSession::in_dir(&common.state_dir, params))
}

fn camera_from(frames: &[PathBuf]) -> CliResult<Camera<ImageSequenceSource>> {
    Ok(Camera::new(ImageSequenceSource::open(frames)?.cycled()))
}

fn parse_point(s: &str) -> CliResult<Point2<f32>> {
    let bad = || CliError::BadPoint(s.to_string());
    let (x, y) = s.split_once(',').ok_or_else(bad)?;
    let x: f32 = x.trim().parse().map_err(|_| bad())?;
    let y: f32 = y.trim().parse().map_err(|_| bad())?;
    Ok(Point2::new(x, y))
}

// ── calibrate ──────────────────────────────────────────────────────────

fn run_calibrate(session: &mut BoardTrackingSession, points: &[String]) -> CliResult<()> {
    let pts = points
        .iter()
        .map(|s| parse_point(s))
        .collect::<CliResult<Vec<_>>>()?;
    let quad = session.set_manual_corners(&pts)?;
    for (name, p) in ["top-left", "top-right", "bottom-right", "bottom-left"]
        .iter()
        .zip(quad.corners.iter())
    {
        println!("{name:>12}: ({:.1}, {:.1})", p.x, p.y);
    }
    Ok(())
}

// ── reference / turn ───────────────────────────────────────────────────

fn run_reference(
    session: &mut BoardTrackingSession,
    new_game: bool,
    frames: &[PathBuf],
) -> CliResult<()> {
    let camera = camera_from(frames)?;
    if new_game {
        session.new_game(&camera)?;
        println!("new game, reference captured");
        print_board(session);
    } else {
        session.set_reference(&camera)?;
        println!("reference captured");
    }
    Ok(())
}

fn run_turn(session: &mut BoardTrackingSession, frames: &[PathBuf]) -> CliResult<()> {
    let camera = camera_from(frames)?;
    let outcome = session.complete_turn(&camera)?;
    println!("{}", outcome.record.notation);
    if outcome.resolved.is_fallback() {
        println!("(no pair cleared the threshold; best guess)");
    }
    print_board(session);
    Ok(())
}

// ── diff ───────────────────────────────────────────────────────────────

fn run_diff(
    session: &mut BoardTrackingSession,
    frame: &Path,
    overlay: Option<&Path>,
) -> CliResult<()> {
    let baseline = *session.baseline().ok_or(SessionError::MissingBaseline)?;
    let image = load_rgb(frame)?;
    let camera = Camera::new(ImageSequenceSource::new(vec![image.clone()]).cycled());
    let grid = session.capture_grid(&camera)?;
    let report = detect_changes(&grid, &baseline, &session.params().change);

    for row in 0..BOARD_SIZE {
        print!("{} ", BOARD_SIZE - row);
        for col in 0..BOARD_SIZE {
            let sq = Square::new(row, col);
            let mark = if report.is_significant(sq) { '*' } else { ' ' };
            print!(" {:6.2}{mark}", report.deviation(sq));
        }
        println!();
    }
    print!("  ");
    for col in 0..BOARD_SIZE {
        print!("  {:>6}", (b'a' + col as u8) as char);
    }
    println!();
    println!(
        "threshold {:.2} (mean {:.2}, std {:.2})",
        report.threshold, report.mean, report.stddev
    );

    let highlight = (!report.is_static()).then(|| {
        resolve_move(
            &report,
            &session.board().pieces,
            session.turn(),
            &session.params().resolver,
        )
    });
    if let Some(m) = &highlight {
        println!("likely move {}", m.uci());
    }

    if let Some(path) = overlay {
        let rectified = session.observe(&image.view());
        save_rgb(
            &render_overlay(&rectified.image, &report, highlight.as_ref()),
            path,
        )?;
        println!("overlay written to {}", path.display());
    }
    Ok(())
}

// ── show ───────────────────────────────────────────────────────────────

fn print_board(session: &BoardTrackingSession) {
    let board = session.board();
    println!("{board}");
    println!("{} to move", board.turn);
    for (i, m) in board.move_history.iter().enumerate() {
        println!("{:>3}. {m}", i + 1);
    }
}
