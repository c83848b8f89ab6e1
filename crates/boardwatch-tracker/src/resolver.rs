//! Pair the strongest changed cells into a source/destination move.

use crate::board::{Pieces, Side};
use crate::change::{ChangeReport, MoveCandidate};
use crate::grid::Square;
use crate::params::ResolverParams;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedMove {
    pub src: Square,
    pub dst: Square,
    /// Pair score; `None` when the fallback path picked the pair.
    pub score: Option<f32>,
}

impl ResolvedMove {
    pub fn is_fallback(&self) -> bool {
        self.score.is_none()
    }

    /// Coordinate-only UCI string such as `"e2e4"`.
    pub fn uci(&self) -> String {
        format!("{}{}", self.src, self.dst)
    }
}

fn score_pair(
    src: &MoveCandidate,
    dst: &MoveCandidate,
    pieces: &Pieces,
    mover: Side,
    params: &ResolverParams,
) -> f32 {
    let mut score =
        params.source_weight * src.deviation + params.destination_weight * dst.deviation;

    let at = |sq: Square| pieces[sq.row][sq.col];
    if at(src.square).is_some_and(|p| p.side == mover) {
        score += params.mover_bonus;
    }
    match at(dst.square) {
        None => score += params.target_bonus,
        Some(p) if p.side != mover => score += params.target_bonus,
        Some(_) => {}
    }
    if src.square == dst.square {
        score -= params.same_cell_penalty;
    }
    score
}

/// Best scoring `(src, dst)` among the top cells, or the two largest deviations.
///
/// A pair is only scored when at least one of its cells clears the
/// threshold. Never fails: with no scorable pair the two highest-deviation
/// cells are returned in rank order.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(report, pieces, params)))]
pub fn resolve_move(
    report: &ChangeReport,
    pieces: &Pieces,
    mover: Side,
    params: &ResolverParams,
) -> ResolvedMove {
    let ranked = report.ranked();
    let top = &ranked[..params.top_k.clamp(2, ranked.len())];

    let mut best: Option<ResolvedMove> = None;
    for (i, a) in top.iter().enumerate() {
        for b in &top[i + 1..] {
            if a.deviation < report.threshold && b.deviation < report.threshold {
                continue;
            }
            for (src, dst) in [(a, b), (b, a)] {
                let s = score_pair(src, dst, pieces, mover, params);
                if best.map_or(true, |m| m.score.is_some_and(|bs| s > bs)) {
                    best = Some(ResolvedMove {
                        src: src.square,
                        dst: dst.square,
                        score: Some(s),
                    });
                }
            }
        }
    }

    match best {
        Some(m) => {
            log::info!(
                "resolver: {} -> {} score {:.2}",
                m.src,
                m.dst,
                m.score.unwrap_or_default()
            );
            m
        }
        None => {
            let m = ResolvedMove {
                src: ranked[0].square,
                dst: ranked[1].square,
                score: None,
            };
            log::info!(
                "resolver: no pair above {:.2}, falling back to {} -> {}",
                report.threshold,
                m.src,
                m.dst
            );
            m
        }
    }
}
