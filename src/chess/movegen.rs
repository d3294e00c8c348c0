//! Legal move generation.
//!
//! Moves are legal by construction rather than generated pseudo-legally and
//! filtered: before any move is emitted the position is analysed into a
//! check mask (where a non-king piece may move while resolving a check),
//! two pin masks (rays a pinned piece is confined to) and the set of
//! squares seen by the enemy (forbidden to the king). Each piece class then
//! ANDs its attack set with the applicable masks, so every emitted move is
//! already legal.

use crate::chess::attacks;
use crate::chess::bitboard::Bitboard;
use crate::chess::core::{CastleRights, Direction, File, PieceKind, Player, Rank, Square};
use crate::chess::moves::{Move, MoveList};
use crate::chess::position::Position;

/// Restricts which legal moves are emitted. Captures include en passant and
/// all promotions (they change the material balance); quiets are the rest.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MoveFilter {
    /// Every legal move.
    All,
    /// Legal moves onto an enemy piece, plus en passant and promotions.
    Captures,
    /// Legal moves onto empty squares, excluding promotions.
    Quiets,
}

/// The pin, check and king-safety analysis of a position, from the
/// perspective of the side to move.
pub(super) struct AttackInfo {
    /// Enemy pieces currently giving check.
    pub(super) checkers: Bitboard,
    /// Squares a non-king piece may move to: all squares when not in
    /// check, otherwise the single checker and the ray between it and the
    /// king (just the checker's square for knight and pawn checks).
    pub(super) check_mask: Bitboard,
    /// Union of rank/file pin rays (each includes the pinning piece).
    pub(super) pin_hv: Bitboard,
    /// Union of diagonal pin rays (each includes the pinning piece).
    pub(super) pin_d: Bitboard,
    /// Squares attacked by the enemy, computed with our king removed from
    /// the occupancy so that sliders see through it. The king may not move
    /// to any of these.
    pub(super) seen: Bitboard,
}

impl AttackInfo {
    pub(super) fn new(position: &Position) -> Self {
        let us = position.us();
        let them = !us;
        let king = position.king_square(us);
        let occ_us = position.occupancy(us);
        let occ_them = position.occupancy(them);
        let occ_all = occ_us | occ_them;

        let seen = seen_squares(
            position,
            them,
            occ_all - position.pieces_of(us, PieceKind::King),
        );

        let their_queens = position.pieces_of(them, PieceKind::Queen);
        let pawn_checkers =
            position.pieces_of(them, PieceKind::Pawn) & attacks::pawn_attacks(king, us);
        let knight_checkers =
            position.pieces_of(them, PieceKind::Knight) & attacks::knight_attacks(king);
        let diagonal_checkers = (position.pieces_of(them, PieceKind::Bishop) | their_queens)
            & attacks::bishop_attacks(king, occ_all);
        let line_checkers = (position.pieces_of(them, PieceKind::Rook) | their_queens)
            & attacks::rook_attacks(king, occ_all);
        let checkers = pawn_checkers | knight_checkers | diagonal_checkers | line_checkers;

        let check_mask = if checkers.is_empty() {
            Bitboard::full()
        } else {
            // Captures of a leaper checker, or anything along a slider
            // checker's ray.
            let mut mask = pawn_checkers | knight_checkers;
            for checker in diagonal_checkers | line_checkers {
                mask |= attacks::between(king, checker) | Bitboard::from(checker);
            }
            mask
        };

        // A candidate pin ray runs from the king to the first enemy slider
        // of the matching kind, with only enemy pieces blocking the view.
        // It is a real pin iff exactly one friendly piece stands on it.
        let mut pin_hv = Bitboard::empty();
        let their_line_pieces = position.pieces_of(them, PieceKind::Rook) | their_queens;
        for attacker in their_line_pieces & attacks::rook_attacks(king, occ_them) {
            let ray = attacks::between(king, attacker) | Bitboard::from(attacker);
            if (ray & occ_us).count() == 1 {
                pin_hv |= ray;
            }
        }
        let mut pin_d = Bitboard::empty();
        let their_diagonal_pieces = position.pieces_of(them, PieceKind::Bishop) | their_queens;
        for attacker in their_diagonal_pieces & attacks::bishop_attacks(king, occ_them) {
            let ray = attacks::between(king, attacker) | Bitboard::from(attacker);
            if (ray & occ_us).count() == 1 {
                pin_d |= ray;
            }
        }

        Self {
            checkers,
            check_mask,
            pin_hv,
            pin_d,
            seen,
        }
    }
}

/// All squares attacked by `attacker` under the given occupancy. The caller
/// passes the occupancy with the defending king removed, so sliders keep
/// attacking "through" it.
fn seen_squares(position: &Position, attacker: Player, occupancy: Bitboard) -> Bitboard {
    let pawns = position.pieces_of(attacker, PieceKind::Pawn);
    let (capture_west, capture_east) = pawn_capture_directions(attacker);
    let mut seen = pawns.shift(capture_west) | pawns.shift(capture_east);
    for from in position.pieces_of(attacker, PieceKind::Knight) {
        seen |= attacks::knight_attacks(from);
    }
    for from in position.pieces_of(attacker, PieceKind::Bishop) {
        seen |= attacks::bishop_attacks(from, occupancy);
    }
    for from in position.pieces_of(attacker, PieceKind::Rook) {
        seen |= attacks::rook_attacks(from, occupancy);
    }
    for from in position.pieces_of(attacker, PieceKind::Queen) {
        seen |= attacks::queen_attacks(from, occupancy);
    }
    seen | attacks::king_attacks(position.king_square(attacker))
}

const fn pawn_capture_directions(player: Player) -> (Direction, Direction) {
    match player {
        Player::White => (Direction::UpLeft, Direction::UpRight),
        Player::Black => (Direction::DownLeft, Direction::DownRight),
    }
}

/// Appends all legal moves matching `filter` to `moves`.
pub(super) fn generate(position: &Position, filter: MoveFilter, moves: &mut MoveList) {
    let us = position.us();
    let them = !us;
    let king = position.king_square(us);
    let occ_us = position.occupancy(us);
    let occ_them = position.occupancy(them);
    let occ_all = occ_us | occ_them;
    let info = AttackInfo::new(position);

    let target = match filter {
        MoveFilter::All => !occ_us,
        MoveFilter::Captures => occ_them,
        MoveFilter::Quiets => !occ_all,
    };

    generate_king_moves(position, &info, filter, us, king, target, occ_all, moves);
    // Double check: no piece can block or capture two checkers at once, so
    // the king moves generated above are all there is.
    if info.checkers.count() >= 2 {
        return;
    }
    generate_pawn_moves(position, &info, filter, us, king, occ_all, occ_them, moves);
    generate_knight_moves(position, &info, us, target, moves);
    generate_slider_moves(position, &info, us, target, occ_all, moves);
}

/// Returns true if the side to move has at least one legal move,
/// short-circuiting on the first one found.
pub(super) fn has_legal_moves(position: &Position) -> bool {
    let us = position.us();
    let king = position.king_square(us);
    let occ_us = position.occupancy(us);
    let occ_them = position.occupancy(!us);
    let occ_all = occ_us | occ_them;
    let info = AttackInfo::new(position);

    // Castling needs no separate probe: it requires the adjacent transit
    // square to be a legal king move in the first place.
    if (attacks::king_attacks(king) & !occ_us & !info.seen).has_any() {
        return true;
    }
    if info.checkers.count() >= 2 {
        return false;
    }

    let pawns = position.pieces_of(us, PieceKind::Pawn);
    for from in pawns {
        if single_pawn_moves(&info, from, us, occ_all, occ_them).has_any() {
            return true;
        }
    }
    if let Some(en_passant_square) = position.en_passant_square() {
        let ep = Bitboard::from(en_passant_square);
        let (capture_west, capture_east) = pawn_capture_directions(us);
        for direction in [capture_west, capture_east] {
            if (pawns.shift(direction) & ep).has_any() {
                let from = en_passant_square.shift(direction.opposite()).unwrap();
                if en_passant_is_legal(position, &info, us, king, from, en_passant_square) {
                    return true;
                }
            }
        }
    }
    for from in position.pieces_of(us, PieceKind::Knight) - (info.pin_hv | info.pin_d) {
        if (attacks::knight_attacks(from) & !occ_us & info.check_mask).has_any() {
            return true;
        }
    }
    for from in position.pieces_of(us, PieceKind::Bishop) {
        if diagonal_slider_targets(&info, from, occ_all, !occ_us).has_any() {
            return true;
        }
    }
    for from in position.pieces_of(us, PieceKind::Rook) {
        if line_slider_targets(&info, from, occ_all, !occ_us).has_any() {
            return true;
        }
    }
    for from in position.pieces_of(us, PieceKind::Queen) {
        if (diagonal_slider_targets(&info, from, occ_all, !occ_us)
            | line_slider_targets(&info, from, occ_all, !occ_us))
        .has_any()
        {
            return true;
        }
    }
    false
}

#[allow(clippy::too_many_arguments)]
fn generate_king_moves(
    position: &Position,
    info: &AttackInfo,
    filter: MoveFilter,
    us: Player,
    king: Square,
    target: Bitboard,
    occ_all: Bitboard,
    moves: &mut MoveList,
) {
    let mut king_moves = attacks::king_attacks(king) & target & !info.seen;

    let rights = position.castling();
    if filter != MoveFilter::Captures
        && info.checkers.is_empty()
        && rights.intersects(CastleRights::both(us))
    {
        let backrank = Rank::backrank(us);
        let (short_walk, long_walk) = match us {
            Player::White => (
                attacks::WHITE_SHORT_CASTLE_WALK,
                attacks::WHITE_LONG_CASTLE_WALK,
            ),
            Player::Black => (
                attacks::BLACK_SHORT_CASTLE_WALK,
                attacks::BLACK_LONG_CASTLE_WALK,
            ),
        };
        // Short: f- and g-squares empty and unattacked. The f-square test
        // rides on the regular king moves computed above.
        let transit = Square::new(File::F, backrank);
        let landing = Square::new(File::G, backrank);
        if rights.contains(CastleRights::short(us))
            && (occ_all & short_walk).is_empty()
            && king_moves.contains(transit)
            && !info.seen.contains(landing)
        {
            king_moves.extend(landing);
        }
        // Long: b-, c- and d-squares empty, c- and d-squares unattacked
        // (the rook may pass through an attacked b-square).
        let transit = Square::new(File::D, backrank);
        let landing = Square::new(File::C, backrank);
        if rights.contains(CastleRights::long(us))
            && (occ_all & long_walk).is_empty()
            && king_moves.contains(transit)
            && !info.seen.contains(landing)
        {
            king_moves.extend(landing);
        }
    }

    for to in king_moves {
        moves.push(Move::new(PieceKind::King, king, to));
    }
}

#[allow(clippy::too_many_arguments)]
fn generate_pawn_moves(
    position: &Position,
    info: &AttackInfo,
    filter: MoveFilter,
    us: Player,
    king: Square,
    occ_all: Bitboard,
    occ_them: Bitboard,
    moves: &mut MoveList,
) {
    let pawns = position.pieces_of(us, PieceKind::Pawn);
    let empty = !occ_all;
    let up = us.push_direction();
    let down = up.opposite();
    let (capture_west, capture_east) = pawn_capture_directions(us);
    let promo_rank = Rank::pawns_promoting(us).mask();
    let double_push_rank = match us {
        Player::White => Rank::Three.mask(),
        Player::Black => Rank::Six.mask(),
    };
    let pinned = info.pin_hv | info.pin_d;

    // Unpinned pawns below the promotion rank move in bulk: one shift per
    // move kind covers all of them at once.
    let movable = pawns - pinned - promo_rank;
    let mut single_pushes = movable.shift(up) & empty;
    // The intermediate square of a double push must be empty even when it
    // is outside the check mask.
    let double_pushes = (single_pushes & double_push_rank).shift(up) & empty & info.check_mask;
    single_pushes &= info.check_mask;
    let captures_west = movable.shift(capture_west) & occ_them & info.check_mask;
    let captures_east = movable.shift(capture_east) & occ_them & info.check_mask;

    if filter != MoveFilter::Captures {
        for to in single_pushes {
            moves.push(Move::new(PieceKind::Pawn, to.shift(down).unwrap(), to));
        }
        for to in double_pushes {
            let from = to.shift(down).unwrap().shift(down).unwrap();
            moves.push(Move::new(PieceKind::Pawn, from, to));
        }
    }
    if filter != MoveFilter::Quiets {
        for to in captures_west {
            let from = to.shift(capture_west.opposite()).unwrap();
            moves.push(Move::new(PieceKind::Pawn, from, to));
        }
        for to in captures_east {
            let from = to.shift(capture_east.opposite()).unwrap();
            moves.push(Move::new(PieceKind::Pawn, from, to));
        }
    }

    // Pinned pawns are rare: enumerate them individually. A diagonally
    // pinned pawn may only capture its pinner's ray; an orthogonally
    // pinned one may only push along its file.
    if filter != MoveFilter::Quiets {
        for from in (pawns & info.pin_d) - promo_rank {
            let targets = attacks::pawn_attacks(from, us) & info.pin_d & info.check_mask & occ_them;
            for to in targets {
                moves.push(Move::new(PieceKind::Pawn, from, to));
            }
        }
    }
    if filter != MoveFilter::Captures {
        for from in (pawns & info.pin_hv) - promo_rank {
            let targets = pawn_pushes(occ_all, from, us) & info.pin_hv & info.check_mask;
            for to in targets {
                moves.push(Move::new(PieceKind::Pawn, from, to));
            }
        }
    }

    // Pawns about to promote yield four moves per target. Promotions count
    // as captures for filtering purposes: they change the material
    // balance.
    if filter != MoveFilter::Quiets {
        for from in pawns & promo_rank {
            let targets = single_pawn_moves(info, from, us, occ_all, occ_them);
            for to in targets {
                moves.push(Move::new_promotion(PieceKind::Queen, from, to));
                moves.push(Move::new_promotion(PieceKind::Rook, from, to));
                moves.push(Move::new_promotion(PieceKind::Bishop, from, to));
                moves.push(Move::new_promotion(PieceKind::Knight, from, to));
            }
        }
    }

    if filter != MoveFilter::Quiets {
        if let Some(en_passant_square) = position.en_passant_square() {
            let ep = Bitboard::from(en_passant_square);
            for direction in [capture_west, capture_east] {
                if (pawns.shift(direction) & ep).has_any() {
                    let from = en_passant_square.shift(direction.opposite()).unwrap();
                    if en_passant_is_legal(position, info, us, king, from, en_passant_square) {
                        moves.push(Move::new(PieceKind::Pawn, from, en_passant_square));
                    }
                }
            }
        }
    }
}

/// Push and capture targets of a single pawn, honouring pins and the check
/// mask. Used for promotion enumeration and existence checks.
fn single_pawn_moves(
    info: &AttackInfo,
    from: Square,
    us: Player,
    occ_all: Bitboard,
    occ_them: Bitboard,
) -> Bitboard {
    let from_bb = Bitboard::from(from);
    if (info.pin_d & from_bb).has_any() {
        return attacks::pawn_attacks(from, us) & info.pin_d & info.check_mask & occ_them;
    }
    if (info.pin_hv & from_bb).has_any() {
        return pawn_pushes(occ_all, from, us) & info.pin_hv & info.check_mask;
    }
    ((attacks::pawn_attacks(from, us) & occ_them) | pawn_pushes(occ_all, from, us))
        & info.check_mask
}

/// Single push, extended by the double push for pawns still on their
/// starting rank. Both steps require empty squares.
fn pawn_pushes(occ_all: Bitboard, from: Square, us: Player) -> Bitboard {
    let up = us.push_direction();
    let push = Bitboard::from(from).shift(up) - occ_all;
    if from.rank() == Rank::pawns_starting(us) {
        push | (push.shift(up) - occ_all)
    } else {
        push
    }
}

/// Decides the legality of the en-passant capture from `from`, including
/// the horizontally-pinned edge case: removing both pawns from the rank
/// may expose the king to a rook or queen. The probe runs on a copy of the
/// occupancy; the position itself is never touched.
fn en_passant_is_legal(
    position: &Position,
    info: &AttackInfo,
    us: Player,
    king: Square,
    from: Square,
    en_passant_square: Square,
) -> bool {
    let from_bb = Bitboard::from(from);
    if (info.pin_hv & from_bb).has_any() {
        return false;
    }
    if (info.pin_d & from_bb).has_any() && !info.pin_d.contains(en_passant_square) {
        return false;
    }
    let them = !us;
    let captured_pawn = en_passant_square
        .shift(us.push_direction().opposite())
        .unwrap();
    if info.checkers.has_any() {
        // In check, the capture is legal only when it removes the checking
        // pawn. No check ray can pass through the en-passant square: the
        // double push either delivered the check itself or discovered one
        // through its origin square.
        return info.check_mask.contains(captured_pawn);
    }
    let their_line_pieces =
        position.pieces_of(them, PieceKind::Rook) | position.pieces_of(them, PieceKind::Queen);
    if (their_line_pieces & king.rank().mask()).has_any() {
        // Both pawns leave the rank at once; probe the resulting
        // occupancy for a discovered rook or queen attack.
        let mut occupancy = position.occupied_squares();
        occupancy.clear(from);
        occupancy.clear(captured_pawn);
        occupancy.extend(en_passant_square);
        if (attacks::rook_attacks(king, occupancy) & their_line_pieces).has_any() {
            return false;
        }
    }
    true
}

fn generate_knight_moves(
    position: &Position,
    info: &AttackInfo,
    us: Player,
    target: Bitboard,
    moves: &mut MoveList,
) {
    // A pinned knight can never stay on its pin ray: it has no moves.
    for from in position.pieces_of(us, PieceKind::Knight) - (info.pin_hv | info.pin_d) {
        let targets = attacks::knight_attacks(from) & target & info.check_mask;
        for to in targets {
            moves.push(Move::new(PieceKind::Knight, from, to));
        }
    }
}

fn generate_slider_moves(
    position: &Position,
    info: &AttackInfo,
    us: Player,
    target: Bitboard,
    occ_all: Bitboard,
    moves: &mut MoveList,
) {
    for from in position.pieces_of(us, PieceKind::Bishop) {
        for to in diagonal_slider_targets(info, from, occ_all, target) {
            moves.push(Move::new(PieceKind::Bishop, from, to));
        }
    }
    for from in position.pieces_of(us, PieceKind::Rook) {
        for to in line_slider_targets(info, from, occ_all, target) {
            moves.push(Move::new(PieceKind::Rook, from, to));
        }
    }
    for from in position.pieces_of(us, PieceKind::Queen) {
        let targets = diagonal_slider_targets(info, from, occ_all, target)
            | line_slider_targets(info, from, occ_all, target);
        for to in targets {
            moves.push(Move::new(PieceKind::Queen, from, to));
        }
    }
}

/// Diagonal attacks of a bishop-mover on `from`: empty when pinned to a
/// rank or file, confined to the pin ray when pinned diagonally.
fn diagonal_slider_targets(
    info: &AttackInfo,
    from: Square,
    occ_all: Bitboard,
    target: Bitboard,
) -> Bitboard {
    let from_bb = Bitboard::from(from);
    if (info.pin_hv & from_bb).has_any() {
        return Bitboard::empty();
    }
    let targets = attacks::bishop_attacks(from, occ_all) & target & info.check_mask;
    if (info.pin_d & from_bb).has_any() {
        targets & info.pin_d
    } else {
        targets
    }
}

/// Rank/file attacks of a rook-mover on `from`: empty when pinned
/// diagonally, confined to the pin ray when pinned to a rank or file.
fn line_slider_targets(
    info: &AttackInfo,
    from: Square,
    occ_all: Bitboard,
    target: Bitboard,
) -> Bitboard {
    let from_bb = Bitboard::from(from);
    if (info.pin_d & from_bb).has_any() {
        return Bitboard::empty();
    }
    let targets = attacks::rook_attacks(from, occ_all) & target & info.check_mask;
    if (info.pin_hv & from_bb).has_any() {
        targets & info.pin_hv
    } else {
        targets
    }
}
