//! Provides the fully-specified [Chess Position] implementation: pieces and
//! their placement, castling rights, side to move, 50-move rule clock and
//! the incrementally maintained Zobrist hash.
//!
//! The position is mutated exclusively through [`Position::make_move`] /
//! [`Position::unmake_move`] (and their null-move counterparts), which keep
//! the piece bitboards, the square-centric mailbox and the hash coherent at
//! all times.
//!
//! [Chess Position]: https://www.chessprogramming.org/Chess_Position

use std::fmt::{self, Write};

use anyhow::{bail, Context};
use strum::IntoEnumIterator;

use crate::chess::attacks;
use crate::chess::bitboard::Bitboard;
use crate::chess::core::{
    CastleRights, File, Piece, PieceKind, Player, Rank, Square, BOARD_WIDTH,
};
use crate::chess::movegen::{self, MoveFilter};
use crate::chess::moves::{Move, MoveList};
use crate::chess::zobrist;

/// Everything [`Position::unmake_move`] needs beyond the move itself: the
/// four fields a move can clobber irreversibly. The bitboards are restored
/// from the move's own encoding, which keeps the undo frame at a few bytes
/// instead of a full board copy per ply.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct UndoState {
    en_passant_square: Option<Square>,
    castling: CastleRights,
    halfmove_clock: u8,
    captured: Option<Piece>,
}

/// A chess position: piece placement in twelve per-piece bitboards plus a
/// 64-entry mailbox (redundant, for O(1) square-to-piece lookup), the
/// game-state fields FEN tracks, and the undo/hash bookkeeping that makes
/// make/unmake reversible.
///
/// [`Position::from_fen`] is the only public way to construct one; it
/// validates the input enough to guarantee the move generator can operate
/// on the result safely.
#[derive(Clone, PartialEq, Eq)]
pub struct Position {
    bitboards: [Bitboard; 12],
    board: [Option<Piece>; 64],
    side_to_move: Player,
    castling: CastleRights,
    en_passant_square: Option<Square>,
    /// [Halfmove Clock]: number of halfmoves since the last capture or pawn
    /// move, enforcing the fifty-move draw rule.
    ///
    /// [Halfmove Clock]: https://www.chessprogramming.org/Halfmove_Clock
    halfmove_clock: u8,
    fullmove_number: u16,
    hash: zobrist::Key,
    /// Keys of all positions reached by the moves made so far; drives
    /// repetition detection.
    hash_history: Vec<zobrist::Key>,
    undo_stack: Vec<UndoState>,
}

const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Position {
    /// Creates the starting position of standard chess.
    ///
    /// ```
    /// use tabiya::chess::position::Position;
    ///
    /// let starting_position = Position::starting();
    /// assert_eq!(
    ///     &starting_position.to_string(),
    ///     "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    /// );
    /// ```
    #[must_use]
    pub fn starting() -> Self {
        Self::from_fen(STARTING_FEN).expect("the starting position is valid")
    }

    /// The player to make the next move.
    #[must_use]
    pub const fn us(&self) -> Player {
        self.side_to_move
    }

    /// The player waiting for their turn.
    #[must_use]
    pub fn them(&self) -> Player {
        !self.us()
    }

    /// Returns the Zobrist key of the position.
    #[must_use]
    pub const fn hash(&self) -> zobrist::Key {
        self.hash
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn castling(&self) -> CastleRights {
        self.castling
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn en_passant_square(&self) -> Option<Square> {
        self.en_passant_square
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn halfmove_clock(&self) -> u8 {
        self.halfmove_clock
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    /// The piece standing on `square`, if any.
    #[must_use]
    pub fn at(&self, square: Square) -> Option<Piece> {
        self.board[square as usize]
    }

    /// All pieces of `player` of the given `kind`.
    #[must_use]
    pub fn pieces_of(&self, player: Player, kind: PieceKind) -> Bitboard {
        self.bitboards[Piece::new(player, kind).index()]
    }

    /// All squares occupied by `player`.
    #[must_use]
    pub fn occupancy(&self, player: Player) -> Bitboard {
        let block = player as usize * 6;
        self.bitboards[block..block + 6]
            .iter()
            .fold(Bitboard::empty(), |all, bitboard| all | *bitboard)
    }

    /// All occupied squares.
    #[must_use]
    pub fn occupied_squares(&self) -> Bitboard {
        self.occupancy(Player::White) | self.occupancy(Player::Black)
    }

    /// The square of `player`'s king.
    #[must_use]
    pub fn king_square(&self, player: Player) -> Square {
        self.pieces_of(player, PieceKind::King).as_square()
    }

    /// Parses a position from Forsyth-Edwards Notation and checks its
    /// correctness.
    ///
    /// FEN ::=
    ///       Piece Placement
    ///   ' ' Side to move
    ///   ' ' Castling ability
    ///   ' ' En passant target square
    ///   ' ' Halfmove clock
    ///   ' ' Fullmove counter
    ///
    /// The last two fields (together) are optional and default to "0 1":
    /// EPD-style position strings found in books and datasets omit them.
    ///
    /// The en-passant field is honoured only when the capture is actually
    /// playable (an enemy pawn stands ready to take); otherwise it is
    /// dropped, so positions reached by transposition hash identically.
    ///
    /// # Errors
    ///
    /// Returns a parse error on malformed input, or a validation error for
    /// placements the move generator can not operate on (missing kings,
    /// pawns on backranks, inconsistent en-passant square). No partially
    /// parsed state escapes: the caller's position remains untouched.
    pub fn from_fen(input: &str) -> anyhow::Result<Self> {
        let mut parts = input.split(' ');

        let Some(pieces_placement) = parts.next() else {
            bail!("missing pieces placement");
        };
        let mut bitboards = [Bitboard::empty(); 12];
        let mut board = [None; 64];
        let ranks = pieces_placement.split('/');
        let mut rank_id = 8;
        for rank_fen in ranks {
            if rank_id == 0 {
                bail!("expected 8 ranks, got {pieces_placement}");
            }
            rank_id -= 1;
            let rank = Rank::try_from(rank_id)?;
            let mut file: u8 = 0;
            for symbol in rank_fen.chars() {
                if file > BOARD_WIDTH {
                    bail!("file exceeded {BOARD_WIDTH}");
                }
                match symbol {
                    '0' => bail!("increment can not be 0"),
                    '1'..='9' => {
                        file += symbol as u8 - b'0';
                        continue;
                    }
                    _ => (),
                }
                let piece = Piece::try_from(symbol)?;
                let square = Square::new(file.try_into()?, rank);
                bitboards[piece.index()].extend(square);
                board[square as usize] = Some(piece);
                file += 1;
            }
            if file != BOARD_WIDTH {
                bail!("rank size should be exactly {BOARD_WIDTH}, got {rank_fen} of length {file}");
            }
        }
        if rank_id != 0 {
            bail!("there should be 8 ranks, got {pieces_placement}");
        }

        let side_to_move = match parts.next() {
            Some(value) => value.try_into()?,
            None => bail!("missing side to move"),
        };
        let castling = match parts.next() {
            Some(value) => value.try_into()?,
            None => bail!("missing castling rights"),
        };
        let en_passant_square = match parts.next() {
            Some("-") => None,
            Some(value) => Some(value.try_into()?),
            None => bail!("missing en passant square"),
        };
        let halfmove_clock = match parts.next() {
            Some(value) => Some(
                value
                    .parse::<u8>()
                    .with_context(|| format!("halfmove clock can not be parsed: {value}"))?,
            ),
            None => None,
        };
        let fullmove_number = match parts.next() {
            Some(value) => match value
                .parse::<u16>()
                .with_context(|| format!("fullmove counter can not be parsed: {value}"))?
            {
                0 => bail!("fullmove counter can not be 0"),
                number => Some(number),
            },
            None => match halfmove_clock {
                Some(_) => bail!("if halfmove clock is present, fullmove counter must be present"),
                // This is a correct EPD position.
                None => None,
            },
        };
        if parts.next().is_some() {
            bail!("trailing symbols");
        }

        let mut result = Self {
            bitboards,
            board,
            side_to_move,
            castling,
            en_passant_square,
            halfmove_clock: halfmove_clock.unwrap_or(0),
            fullmove_number: fullmove_number.unwrap_or(1),
            hash: 0,
            hash_history: Vec::new(),
            undo_stack: Vec::new(),
        };
        // Honour the en-passant field only when the capture is playable:
        // hashing a phantom opportunity would make transpositions hash
        // differently.
        if let Some(en_passant_square) = result.en_passant_square {
            let capturers = attacks::pawn_attacks(en_passant_square, result.them())
                & result.pieces_of(result.us(), PieceKind::Pawn);
            if capturers.is_empty() {
                result.en_passant_square = None;
            }
        }
        result.hash = result.compute_hash();

        match validate(&result) {
            Ok(()) => Ok(result),
            Err(e) => Err(e.context("illegal position")),
        }
    }

    /// Calculates the list of legal moves (i.e. the moves that do not leave
    /// our king in check) matching `filter`.
    ///
    /// This is a performance and correctness-critical path: every
    /// modification should be benchmarked and carefully tested.
    #[must_use]
    pub fn legal_moves(&self, filter: MoveFilter) -> MoveList {
        debug_assert!(self.is_coherent());
        let mut moves = MoveList::new();
        movegen::generate(self, filter, &mut moves);
        moves
    }

    /// Returns true if the side to move has at least one legal move. Faster
    /// than generating the full list: used to tell checkmate and stalemate
    /// apart (combined with [`Position::in_check`]).
    #[must_use]
    pub fn has_legal_moves(&self) -> bool {
        debug_assert!(self.is_coherent());
        movegen::has_legal_moves(self)
    }

    /// Resolves a [UCI move string] (e.g. `e2e4`, `e7e8q`, `e1g1`) against
    /// the legal moves of this position.
    ///
    /// # Errors
    ///
    /// Returns an error when the string does not name a legal move.
    ///
    /// [UCI move string]: https://www.chessprogramming.org/Algebraic_Chess_Notation#Pure_coordinate_notation
    pub fn move_from_uci(&self, uci: &str) -> anyhow::Result<Move> {
        for mv in &self.legal_moves(MoveFilter::All) {
            if mv.to_string() == uci {
                return Ok(mv);
            }
        }
        bail!("'{uci}' is not a legal move in '{self}'")
    }

    /// Transitions to the next position by applying the move.
    ///
    /// The caller must pass a move produced by [`Position::legal_moves`]
    /// for this position; behaviour on any other input is unspecified. The
    /// hash is updated incrementally and the pre-move state is pushed onto
    /// the undo stack for [`Position::unmake_move`].
    pub fn make_move(&mut self, next_move: Move) {
        debug_assert!(self.is_coherent());

        let kind = next_move.kind();
        let us = self.side_to_move;
        let them = !us;
        // For promotions the move encodes the promotion target; the piece
        // leaving the source square is a pawn.
        let piece = Piece::new(us, kind);
        let from = next_move.from();
        let to = next_move.to();
        let captured = self.board[to as usize];
        let down = us.push_direction().opposite();

        self.hash_history.push(self.hash);
        self.undo_stack.push(UndoState {
            en_passant_square: self.en_passant_square,
            castling: self.castling,
            halfmove_clock: self.halfmove_clock,
            captured,
        });

        // Reset on captures and pawn moves below.
        self.halfmove_clock = self.halfmove_clock.saturating_add(1);

        let is_en_passant = kind == PieceKind::Pawn && self.en_passant_square == Some(to);

        if let Some(en_passant_square) = self.en_passant_square.take() {
            self.hash ^= zobrist::en_passant_key(en_passant_square.file());
        }
        self.hash ^= zobrist::castling_key(self.castling);

        let castle_rook = if kind == PieceKind::King {
            castle_rook_move(us, from, to)
        } else {
            None
        };
        if let Some((rook_from, rook_to)) = castle_rook {
            let rook = Piece::new(us, PieceKind::Rook);
            self.hash ^= zobrist::piece_key(rook, rook_from);
            self.hash ^= zobrist::piece_key(rook, rook_to);
        }

        match kind {
            PieceKind::King => {
                self.castling.remove(CastleRights::both(us));
            }
            PieceKind::Rook => {
                if let Some(right) = CastleRights::of_rook_home(from) {
                    if CastleRights::both(us).contains(right) {
                        self.castling.remove(right);
                    }
                }
            }
            PieceKind::Pawn => {
                self.halfmove_clock = 0;
                if is_en_passant {
                    let captured_pawn = to.shift(down).unwrap();
                    self.hash ^=
                        zobrist::piece_key(Piece::new(them, PieceKind::Pawn), captured_pawn);
                } else if (from as i8 - to as i8).abs() == 2 * BOARD_WIDTH as i8 {
                    // A double push grants en passant only when an enemy
                    // pawn stands ready to capture; this matches the
                    // Polyglot hashing discipline.
                    let behind = to.shift(down).unwrap();
                    let capturers = attacks::pawn_attacks(behind, us)
                        & self.pieces_of(them, PieceKind::Pawn);
                    if capturers.has_any() {
                        self.en_passant_square = Some(behind);
                        self.hash ^= zobrist::en_passant_key(behind.file());
                    }
                }
            }
            _ => (),
        }

        if let Some(captured_piece) = captured {
            self.halfmove_clock = 0;
            self.hash ^= zobrist::piece_key(captured_piece, to);
            // Capturing a rook on its home square takes the right with it.
            if captured_piece.kind == PieceKind::Rook {
                if let Some(right) = CastleRights::of_rook_home(to) {
                    self.castling.remove(right);
                }
            }
        }

        if next_move.is_promotion() {
            self.halfmove_clock = 0;
            self.hash ^= zobrist::piece_key(Piece::new(us, PieceKind::Pawn), from);
            self.hash ^= zobrist::piece_key(piece, to);
        } else {
            self.hash ^= zobrist::piece_key(piece, from);
            self.hash ^= zobrist::piece_key(piece, to);
        }

        self.hash ^= zobrist::side_to_move_key();
        self.hash ^= zobrist::castling_key(self.castling);

        // The hash is settled; now apply the same edits to the boards.
        if let Some((rook_from, rook_to)) = castle_rook {
            let rook = Piece::new(us, PieceKind::Rook);
            self.remove_piece(rook, rook_from);
            self.place_piece(rook, rook_to);
        }
        if is_en_passant {
            let captured_pawn = to.shift(down).unwrap();
            self.remove_piece(Piece::new(them, PieceKind::Pawn), captured_pawn);
        }
        if let Some(captured_piece) = captured {
            self.remove_piece(captured_piece, to);
        }
        if next_move.is_promotion() {
            self.remove_piece(Piece::new(us, PieceKind::Pawn), from);
            self.place_piece(piece, to);
        } else {
            self.remove_piece(piece, from);
            self.place_piece(piece, to);
        }

        if us == Player::Black {
            self.fullmove_number += 1;
        }
        self.side_to_move = them;
    }

    /// Restores the position as it was before `next_move` was made. The
    /// move must be the most recent one applied with
    /// [`Position::make_move`].
    ///
    /// # Panics
    ///
    /// Panics when there is no move to undo: that is a programming error on
    /// the caller's side.
    pub fn unmake_move(&mut self, next_move: Move) {
        let undo = self
            .undo_stack
            .pop()
            .expect("unmake_move requires a preceding make_move");
        // Restoring the saved key is cheaper than undoing the XORs.
        self.hash = self
            .hash_history
            .pop()
            .expect("hash history parallels the undo stack");
        self.en_passant_square = undo.en_passant_square;
        self.castling = undo.castling;
        self.halfmove_clock = undo.halfmove_clock;

        self.side_to_move = !self.side_to_move;
        let us = self.side_to_move;
        let them = !us;
        if us == Player::Black {
            self.fullmove_number -= 1;
        }

        let kind = next_move.kind();
        let piece = Piece::new(us, kind);
        let from = next_move.from();
        let to = next_move.to();

        if next_move.is_promotion() {
            self.remove_piece(piece, to);
            self.place_piece(Piece::new(us, PieceKind::Pawn), from);
            if let Some(captured_piece) = undo.captured {
                self.place_piece(captured_piece, to);
            }
            return;
        }

        self.remove_piece(piece, to);
        self.place_piece(piece, from);

        if kind == PieceKind::Pawn && self.en_passant_square == Some(to) {
            // The capture happened behind the en-passant square.
            let captured_pawn = to.shift(us.push_direction().opposite()).unwrap();
            self.place_piece(Piece::new(them, PieceKind::Pawn), captured_pawn);
        } else if let Some(captured_piece) = undo.captured {
            self.place_piece(captured_piece, to);
        } else if kind == PieceKind::King {
            if let Some((rook_from, rook_to)) = castle_rook_move(us, from, to) {
                let rook = Piece::new(us, PieceKind::Rook);
                self.remove_piece(rook, rook_to);
                self.place_piece(rook, rook_from);
            }
        }
    }

    /// Passes the turn without moving: flips the side to move and clears
    /// the en-passant opportunity (keying both). The clocks and the hash
    /// history are untouched; a null move is not a real move.
    pub fn make_null_move(&mut self) {
        self.undo_stack.push(UndoState {
            en_passant_square: self.en_passant_square,
            castling: self.castling,
            halfmove_clock: self.halfmove_clock,
            captured: None,
        });
        self.side_to_move = !self.side_to_move;
        self.hash ^= zobrist::side_to_move_key();
        if let Some(en_passant_square) = self.en_passant_square.take() {
            self.hash ^= zobrist::en_passant_key(en_passant_square.file());
        }
    }

    /// Undoes the most recent [`Position::make_null_move`].
    ///
    /// # Panics
    ///
    /// Panics when there is nothing to undo.
    pub fn unmake_null_move(&mut self) {
        let undo = self
            .undo_stack
            .pop()
            .expect("unmake_null_move requires a preceding make_null_move");
        self.en_passant_square = undo.en_passant_square;
        self.castling = undo.castling;
        self.halfmove_clock = undo.halfmove_clock;
        self.hash ^= zobrist::side_to_move_key();
        if let Some(en_passant_square) = self.en_passant_square {
            self.hash ^= zobrist::en_passant_key(en_passant_square.file());
        }
        self.side_to_move = !self.side_to_move;
    }

    /// Detects whether the current position already occurred at least
    /// `occurrences` times in the game so far. Only positions with the same
    /// side to move are compared, and the scan stops at the last
    /// irreversible move (the halfmove clock bounds it).
    ///
    /// `occurrences` of 1 reports a two-fold repetition, which is what
    /// search code wants; pass 2 for the FIDE-style three-fold rule.
    #[must_use]
    pub fn is_repetition(&self, occurrences: usize) -> bool {
        let len = self.hash_history.len() as isize;
        let lower_bound = len - isize::from(self.halfmove_clock);
        let mut seen = 0;
        let mut index = len - 2;
        while index >= 0 && index >= lower_bound {
            if self.hash_history[index as usize] == self.hash {
                seen += 1;
                if seen == occurrences {
                    return true;
                }
            }
            index -= 2;
        }
        false
    }

    /// Returns true if the 50-move rule draw is in effect.
    #[must_use]
    pub const fn halfmove_clock_expired(&self) -> bool {
        self.halfmove_clock >= 100
    }

    /// Is the king of the side to move attacked?
    #[must_use]
    pub fn in_check(&self) -> bool {
        self.is_square_attacked(self.them(), self.king_square(self.us()))
    }

    /// Is `square` attacked by any piece of `player` under the current
    /// occupancy?
    #[must_use]
    pub fn is_square_attacked(&self, player: Player, square: Square) -> bool {
        self.attackers(player, square).has_any()
    }

    /// All pieces of `player` attacking `square`.
    pub(in crate::chess) fn attackers(&self, player: Player, square: Square) -> Bitboard {
        let occupied = self.occupied_squares();
        let queens = self.pieces_of(player, PieceKind::Queen);
        (self.pieces_of(player, PieceKind::Pawn) & attacks::pawn_attacks(square, !player))
            | (self.pieces_of(player, PieceKind::Knight) & attacks::knight_attacks(square))
            | ((self.pieces_of(player, PieceKind::Bishop) | queens)
                & attacks::bishop_attacks(square, occupied))
            | ((self.pieces_of(player, PieceKind::Rook) | queens)
                & attacks::rook_attacks(square, occupied))
            | (self.pieces_of(player, PieceKind::King) & attacks::king_attacks(square))
    }

    /// Returns true when `player` still has material other than pawns and
    /// the king. Null-move heuristics in search rely on this to avoid
    /// zugzwang-prone endgames.
    #[must_use]
    pub fn has_non_pawn_material(&self, player: Player) -> bool {
        (self.pieces_of(player, PieceKind::Knight)
            | self.pieces_of(player, PieceKind::Bishop)
            | self.pieces_of(player, PieceKind::Rook)
            | self.pieces_of(player, PieceKind::Queen))
        .has_any()
    }

    fn place_piece(&mut self, piece: Piece, square: Square) {
        self.bitboards[piece.index()].extend(square);
        self.board[square as usize] = Some(piece);
    }

    fn remove_piece(&mut self, piece: Piece, square: Square) {
        self.bitboards[piece.index()].clear(square);
        self.board[square as usize] = None;
    }

    /// Computes the Polyglot Zobrist hash of the position from scratch.
    ///
    /// This is not efficient and is only used when a position is created;
    /// the hash is maintained incrementally afterwards.
    fn compute_hash(&self) -> zobrist::Key {
        let mut key = 0;
        for square in self.occupied_squares().iter() {
            let piece = self.at(square).expect("occupied square");
            key ^= zobrist::piece_key(piece, square);
        }
        key ^= zobrist::castling_key(self.castling);
        if let Some(en_passant_square) = self.en_passant_square {
            key ^= zobrist::en_passant_key(en_passant_square.file());
        }
        if self.side_to_move == Player::White {
            key ^= zobrist::side_to_move_key();
        }
        key
    }

    /// Checks the internal invariants: the mailbox and the twelve bitboards
    /// describe the same placement, both kings are on the board and the
    /// incremental hash matches a from-scratch computation. Only used in
    /// debug assertions.
    pub(in crate::chess) fn is_coherent(&self) -> bool {
        for square in Square::iter() {
            match self.board[square as usize] {
                Some(piece) => {
                    for (index, bitboard) in self.bitboards.iter().enumerate() {
                        if bitboard.contains(square) != (index == piece.index()) {
                            return false;
                        }
                    }
                }
                None => {
                    if self.bitboards.iter().any(|bitboard| bitboard.contains(square)) {
                        return false;
                    }
                }
            }
        }
        self.pieces_of(Player::White, PieceKind::King).count() == 1
            && self.pieces_of(Player::Black, PieceKind::King).count() == 1
            && self.hash == self.compute_hash()
    }
}

/// The rook relocation of a castling move, identified by the two-square
/// king move. Kings never move two squares otherwise.
const fn castle_rook_move(player: Player, from: Square, to: Square) -> Option<(Square, Square)> {
    match (player, from, to) {
        (Player::White, Square::E1, Square::G1) => Some((Square::H1, Square::F1)),
        (Player::White, Square::E1, Square::C1) => Some((Square::A1, Square::D1)),
        (Player::Black, Square::E8, Square::G8) => Some((Square::H8, Square::F8)),
        (Player::Black, Square::E8, Square::C8) => Some((Square::A8, Square::D8)),
        _ => None,
    }
}

impl TryFrom<&str> for Position {
    type Error = anyhow::Error;

    fn try_from(input: &str) -> anyhow::Result<Self> {
        let input = input.trim();
        for prefix in ["fen ", "epd "] {
            if let Some(stripped) = input.strip_prefix(prefix) {
                return Self::from_fen(stripped);
            }
        }
        Self::from_fen(input)
    }
}

impl fmt::Display for Position {
    /// Returns the position in Forsyth-Edwards Notation (FEN).
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for rank in Rank::iter().rev() {
            let mut empty_squares = 0;
            for file in File::iter() {
                let square = Square::new(file, rank);
                if let Some(piece) = self.at(square) {
                    if empty_squares != 0 {
                        write!(f, "{empty_squares}")?;
                        empty_squares = 0;
                    }
                    write!(f, "{piece}")?;
                } else {
                    empty_squares += 1;
                }
            }
            if empty_squares != 0 {
                write!(f, "{empty_squares}")?;
            }
            if rank != Rank::One {
                const RANK_SEPARATOR: char = '/';
                write!(f, "{RANK_SEPARATOR}")?;
            }
        }
        write!(f, " {} ", &self.side_to_move)?;
        write!(f, "{} ", &self.castling)?;
        match self.en_passant_square {
            Some(square) => write!(f, "{square} "),
            None => write!(f, "- "),
        }?;
        write!(f, "{} ", &self.halfmove_clock)?;
        write!(f, "{}", &self.fullmove_number)?;
        Ok(())
    }
}

impl fmt::Debug for Position {
    /// Dumps the board in a human readable format ('.' for an empty square,
    /// FEN algebraic symbol for a piece) followed by the state fields.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board:")?;
        for rank in Rank::iter().rev() {
            for file in File::iter() {
                match self.at(Square::new(file, rank)) {
                    Some(piece) => write!(f, "{piece}"),
                    None => f.write_char('.'),
                }?;
                if file != File::H {
                    f.write_char(' ')?;
                }
            }
            f.write_char('\n')?;
        }
        writeln!(f, "Player to move: {:?}", &self.side_to_move)?;
        writeln!(f, "Fullmove counter: {}", &self.fullmove_number)?;
        writeln!(f, "En Passant: {:?}", &self.en_passant_square)?;
        writeln!(f, "Castling rights: {}", &self.castling)?;
        writeln!(f, "Hash: {:#018x}", &self.hash)?;
        writeln!(f, "FEN: {}", &self)?;
        Ok(())
    }
}

/// [Perft] (**per**formance **t**esting) traverses the move tree to a fixed
/// depth and counts the leaves. Any discrepancy against the published node
/// counts pinpoints a move generation or make/unmake bug, which makes perft
/// the single strongest correctness test of this crate.
///
/// [Perft]: https://www.chessprogramming.org/Perft
#[must_use]
pub fn perft(position: &mut Position, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = position.legal_moves(MoveFilter::All);
    if depth == 1 {
        return moves.len() as u64;
    }
    let mut nodes = 0;
    for next_move in &moves {
        position.make_move(next_move);
        nodes += perft(position, depth - 1);
        position.unmake_move(next_move);
    }
    nodes
}

/// Checks if the position can be reasoned about by the move generator.
/// Checking whether it is truly reachable from the starting position would
/// require retrograde analysis; this employs a small set of heuristics that
/// filter out the positions that would break the generator's assumptions.
fn validate(position: &Position) -> anyhow::Result<()> {
    for player in [Player::White, Player::Black] {
        let kings = position.pieces_of(player, PieceKind::King).count();
        if kings != 1 {
            bail!("expected 1 {player:?} king, got {kings}");
        }
        let pawns = position.pieces_of(player, PieceKind::Pawn).count();
        if pawns > 8 {
            bail!("expected <= 8 {player:?} pawns, got {pawns}");
        }
    }
    let pawns = position.pieces_of(Player::White, PieceKind::Pawn)
        | position.pieces_of(Player::Black, PieceKind::Pawn);
    if (pawns & (Rank::One.mask() | Rank::Eight.mask())).has_any() {
        bail!("pawns can not be placed on backranks");
    }
    let checkers = position.attackers(position.them(), position.king_square(position.us()));
    if checkers.count() > 2 {
        bail!("expected <= 2 checks, got {}", checkers.count());
    }
    if let Some(en_passant_square) = position.en_passant_square {
        let expected_rank = match position.us() {
            Player::White => Rank::Six,
            Player::Black => Rank::Three,
        };
        if en_passant_square.rank() != expected_rank {
            bail!(
                "expected en passant square on rank {}, got {}",
                expected_rank,
                en_passant_square.rank()
            );
        }
        // The doubly pushed pawn must stand in front of the square.
        let pushed_pawn = en_passant_square
            .shift(position.them().push_direction())
            .unwrap();
        if !position
            .pieces_of(position.them(), PieceKind::Pawn)
            .contains(pushed_pawn)
        {
            bail!("en passant square is not behind a pushed pawn");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn setup(fen: &str) -> Position {
        Position::from_fen(fen).expect("parsing valid position")
    }

    #[test]
    fn starting() {
        let position = Position::starting();
        assert_eq!(
            format!("{position:?}"),
            "Board:\n\
             r n b q k b n r\n\
             p p p p p p p p\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             P P P P P P P P\n\
             R N B Q K B N R\n\
             Player to move: White\n\
             Fullmove counter: 1\n\
             En Passant: None\n\
             Castling rights: KQkq\n\
             Hash: 0x463b96181691fc9c\n\
             FEN: rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1\n"
        );
        assert_eq!(
            position.occupied_squares(),
            Rank::One.mask() | Rank::Two.mask() | Rank::Seven.mask() | Rank::Eight.mask()
        );
        assert_eq!(position.king_square(Player::White), Square::E1);
        assert_eq!(position.king_square(Player::Black), Square::E8);
        assert!(position.has_non_pawn_material(Player::White));
    }

    #[test]
    fn starting_position_polyglot_key() {
        assert_eq!(Position::starting().hash(), 0x463b_9618_1691_fc9c);
    }

    // Reference keys from the Polyglot book format specification: the hash
    // after each move must match an independent implementation exactly,
    // including the "only hash a playable en passant file" rule.
    #[test]
    fn polyglot_keys_along_a_game() {
        let mut position = Position::starting();
        for (next_move, expected) in [
            ("e2e4", 0x823c_9b50_fd11_4196),
            // En passant on e3 is not playable: no key for it.
            ("d7d5", 0x0756_b944_61c5_0fb0),
            ("e4e5", 0x662f_afb9_65db_29d4),
            // En passant on f6 is playable by the e5 pawn and is hashed.
            ("f7f5", 0x22a4_8b5a_8e47_ff78),
            ("e1e2", 0x652a_607c_a3f2_42c1),
            ("e8f7", 0x00fd_d303_c946_bdd9),
        ] {
            let next_move = position.move_from_uci(next_move).unwrap();
            position.make_move(next_move);
            assert_eq!(position.hash(), expected, "after {next_move}");
        }

        // A different line exercising a playable en passant after a chain
        // of flank pushes.
        let mut position = Position::starting();
        for next_move in ["a2a4", "b7b5", "h2h4", "b5b4", "c2c4"] {
            let next_move = position.move_from_uci(next_move).unwrap();
            position.make_move(next_move);
        }
        assert_eq!(position.hash(), 0x3c81_23ea_7b06_7637);
        // b4xc3 en passant is pseudo-legally available.
        assert_eq!(position.en_passant_square(), Some(Square::C3));
    }

    #[test]
    fn fen_round_trip() {
        for fen in [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "2r3r1/p3k3/1p3pp1/1B5p/5P2/2P1p1P1/PP4KP/3R4 w - - 0 34",
            "r2qkb1r/1pp1pp1p/p1np1np1/1B6/3PP1b1/2N1BN2/PPP2PPP/R2QK2R w KQkq - 0 7",
            "r3k3/5p2/2p5/p7/P3r3/2N2n2/1PP2P2/2K2B2 w q - 0 24",
            "8/8/8/8/2P5/3k4/8/KB6 b - - 0 1",
            "rnbq1rk1/pp4pp/1b1ppn2/2p2p2/2PP4/1P2PN2/PB2BPPP/RN1Q1RK1 w - - 0 9",
        ] {
            assert_eq!(setup(fen).to_string(), fen);
        }
    }

    #[test]
    fn fen_en_passant_only_when_capturable() {
        // No white pawn can capture on c6: the field is dropped and the
        // position hashes like its "-" twin.
        let position = setup("rnbqk1nr/p3bppp/1p2p3/2ppP3/3P4/P7/1PP1NPPP/R1BQKBNR w KQkq c6 0 7");
        assert_eq!(position.en_passant_square(), None);
        let twin = setup("rnbqk1nr/p3bppp/1p2p3/2ppP3/3P4/P7/1PP1NPPP/R1BQKBNR w KQkq - 0 7");
        assert_eq!(position.hash(), twin.hash());
        assert_eq!(position.to_string(), twin.to_string());

        // The c4 pawn is ready to capture on d3: the field survives.
        let position = setup("rnbqkbnr/ppp1pppp/8/8/2pP4/5N2/PP2PPPP/RNBQKB1R b KQkq d3 0 3");
        assert_eq!(position.en_passant_square(), Some(Square::D3));
    }

    #[test]
    fn epd_defaults() {
        let position = setup("rnbqkb1r/pp2pppp/3p1n2/8/3NP3/2N5/PPP2PPP/R1BQKB1R b KQkq -");
        assert_eq!(position.halfmove_clock(), 0);
        assert_eq!(position.fullmove_number(), 1);
    }

    #[test]
    fn bad_fens_rejected() {
        for fen in [
            "",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0",
            "rnbqkbnr/pppppppp/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/ppppXppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/ppppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR u KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KXkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e9 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 0",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 extra",
        ] {
            assert!(Position::from_fen(fen).is_err(), "accepted: {fen:?}");
        }
        // Illegal placements.
        assert!(Position::from_fen("3k4/8/8/8/8/8/8/8 w - - 0 1").is_err());
        assert!(Position::from_fen("1kkk4/8/8/8/8/8/8/1KKK4 w - - 0 1").is_err());
        assert!(
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/P7/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
                .is_err()
        );
        // Pawns on either backrank are rejected.
        assert!(Position::from_fen("3kr3/8/8/8/8/5Q2/8/1KP5 w - - 0 1").is_err());
        assert!(Position::from_fen("3kP3/8/8/8/8/8/8/1K6 w - - 0 1").is_err());
    }

    #[test]
    fn make_unmake_round_trip() {
        for fen in [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            "rnbqkbnr/ppp1pppp/8/8/2pP4/5N2/PP2PPPP/RNBQKB1R b KQkq d3 0 3",
        ] {
            let mut position = setup(fen);
            let before = position.clone();
            for next_move in &position.legal_moves(MoveFilter::All) {
                position.make_move(next_move);
                // The mover can never leave their own king attacked.
                assert!(
                    !position.is_square_attacked(
                        position.us(),
                        position.king_square(position.them())
                    ),
                    "{next_move} leaves the king in check in {fen}"
                );
                position.unmake_move(next_move);
                assert_eq!(position, before, "make/unmake of {next_move} in {fen}");
            }
        }
    }

    #[test]
    fn null_move_round_trip() {
        let mut position =
            setup("rnbqkbnr/ppp1pppp/8/8/2pP4/5N2/PP2PPPP/RNBQKB1R b KQkq d3 0 3");
        let before = position.clone();
        position.make_null_move();
        assert_eq!(position.us(), Player::White);
        assert_eq!(position.en_passant_square(), None);
        assert_ne!(position.hash(), before.hash());
        position.unmake_null_move();
        assert_eq!(position, before);
    }

    #[test]
    #[should_panic(expected = "unmake_move requires a preceding make_move")]
    fn unmake_without_make_panics() {
        let mut position = Position::starting();
        let next_move = position.move_from_uci("e2e4").unwrap();
        position.unmake_move(next_move);
    }

    #[test]
    fn repetition_detection() {
        let mut position = Position::starting();
        for next_move in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            assert!(!position.is_repetition(1));
            let next_move = position.move_from_uci(next_move).unwrap();
            position.make_move(next_move);
        }
        // Back to the starting position: a two-fold repetition.
        assert!(position.is_repetition(1));
        assert!(!position.is_repetition(2));
        for next_move in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            let next_move = position.move_from_uci(next_move).unwrap();
            position.make_move(next_move);
        }
        // And a three-fold one.
        assert!(position.is_repetition(2));
    }

    #[test]
    fn repetition_scan_stops_at_irreversible_moves() {
        let mut position = Position::starting();
        for next_move in ["g1f3", "g8f6", "f3g1", "f6g8", "e2e4"] {
            let next_move = position.move_from_uci(next_move).unwrap();
            position.make_move(next_move);
        }
        // The pawn push reset the clock: prior occurrences of the current
        // key cannot exist within the window.
        assert!(!position.is_repetition(1));
    }

    #[test]
    fn clocks() {
        let mut position = Position::starting();
        for next_move in ["g1f3", "g8f6", "f3g1"] {
            let next_move = position.move_from_uci(next_move).unwrap();
            position.make_move(next_move);
        }
        assert_eq!(position.halfmove_clock(), 3);
        assert_eq!(position.fullmove_number(), 2);
        assert!(!position.halfmove_clock_expired());
        let next_move = position.move_from_uci("e7e5").unwrap();
        position.make_move(next_move);
        assert_eq!(position.halfmove_clock(), 0);
        assert_eq!(position.fullmove_number(), 3);
        position.unmake_move(next_move);
        assert_eq!(position.halfmove_clock(), 3);
        assert_eq!(position.fullmove_number(), 2);
    }

    #[test]
    fn in_check_and_attacks() {
        let position = setup("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
        assert!(position.in_check());
        assert!(position.is_square_attacked(Player::Black, Square::E1));
        assert!(!position.is_square_attacked(Player::White, Square::H4));

        let position = setup("8/8/8/3k4/8/8/8/K7 w - - 0 1");
        assert!(!position.in_check());
        assert!(!position.has_non_pawn_material(Player::White));
    }

    #[test]
    fn uci_resolution() {
        let position = Position::starting();
        let next_move = position.move_from_uci("g1f3").unwrap();
        assert_eq!(next_move.from(), Square::G1);
        assert_eq!(next_move.to(), Square::F3);
        assert_eq!(next_move.kind(), PieceKind::Knight);
        assert!(position.move_from_uci("e2e5").is_err());
        assert!(position.move_from_uci("nonsense").is_err());
    }
}
