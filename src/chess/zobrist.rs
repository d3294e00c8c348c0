//! [Zobrist hashing] of chess positions, compatible with the [Polyglot]
//! opening book format: any two implementations hashing with the same fixed
//! table produce identical keys for identical positions.
//!
//! [Zobrist hashing]: https://www.chessprogramming.org/Zobrist_Hashing
//! [Polyglot]: http://hgm.nubati.net/book_format.html

use crate::chess::core::{File, Piece, Player, Square, CastleRights, BOARD_SIZE};
use crate::chess::zobrist_keys::POLYGLOT_RANDOM;

/// Zobrist key is a 64-bit integer.
pub type Key = u64;

const CASTLING_OFFSET: usize = 768;
const EN_PASSANT_OFFSET: usize = 772;
const SIDE_TO_MOVE_OFFSET: usize = 780;

/// XORs of the four castling-right keys for every castling mask, so a
/// rights change costs a single lookup instead of up to four XORs.
const CASTLING_KEYS: [Key; 16] = {
    let mut keys = [0; 16];
    let mut mask = 0;
    while mask < 16 {
        let mut key = 0;
        let mut bit = 0;
        while bit < 4 {
            if mask & (1 << bit) != 0 {
                key ^= POLYGLOT_RANDOM[CASTLING_OFFSET + bit];
            }
            bit += 1;
        }
        keys[mask] = key;
        mask += 1;
    }
    keys
};

/// Key of `piece` standing on `square`.
///
/// Polyglot orders pieces black-pawn-first and white-piece-of-a-kind right
/// after the black one, unlike the board's White-block-first encoding.
#[must_use]
pub(in crate::chess) fn piece_key(piece: Piece, square: Square) -> Key {
    let polyglot_piece =
        piece.kind as usize * 2 + usize::from(piece.player == Player::White);
    POLYGLOT_RANDOM[BOARD_SIZE as usize * polyglot_piece + square as usize]
}

/// Key of an en-passant opportunity on `file`. Only hashed when the capture
/// is actually playable.
#[must_use]
pub(in crate::chess) fn en_passant_key(file: File) -> Key {
    POLYGLOT_RANDOM[EN_PASSANT_OFFSET + file as usize]
}

/// Combined key of all set castling rights.
#[must_use]
pub(in crate::chess) fn castling_key(rights: CastleRights) -> Key {
    CASTLING_KEYS[rights.bits() as usize]
}

/// Key XORed in whenever White is to move.
#[must_use]
pub(in crate::chess) fn side_to_move_key() -> Key {
    POLYGLOT_RANDOM[SIDE_TO_MOVE_OFFSET]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::chess::core::PieceKind;

    #[test]
    fn polyglot_piece_order() {
        // Black pawn on a1 is the very first key of the table.
        assert_eq!(
            piece_key(Piece::new(Player::Black, PieceKind::Pawn), Square::A1),
            POLYGLOT_RANDOM[0]
        );
        // White pawn block comes right after the black pawn block.
        assert_eq!(
            piece_key(Piece::new(Player::White, PieceKind::Pawn), Square::A1),
            POLYGLOT_RANDOM[64]
        );
        // White king on h8 is the last piece-square key.
        assert_eq!(
            piece_key(Piece::new(Player::White, PieceKind::King), Square::H8),
            POLYGLOT_RANDOM[767]
        );
    }

    #[test]
    fn castling_keys_fold() {
        assert_eq!(castling_key(CastleRights::empty()), 0);
        assert_eq!(
            castling_key(CastleRights::WHITE_SHORT),
            POLYGLOT_RANDOM[768]
        );
        assert_eq!(
            castling_key(CastleRights::all()),
            POLYGLOT_RANDOM[768]
                ^ POLYGLOT_RANDOM[769]
                ^ POLYGLOT_RANDOM[770]
                ^ POLYGLOT_RANDOM[771]
        );
        assert_eq!(
            castling_key(CastleRights::WHITE_LONG | CastleRights::BLACK_SHORT),
            POLYGLOT_RANDOM[769] ^ POLYGLOT_RANDOM[770]
        );
    }

    #[test]
    fn en_passant_files() {
        assert_eq!(en_passant_key(File::A), POLYGLOT_RANDOM[772]);
        assert_eq!(en_passant_key(File::H), POLYGLOT_RANDOM[779]);
    }
}
