//! Board primitives commonly used within [`crate::chess`].

use std::{fmt, mem};

use anyhow::bail;

use crate::chess::bitboard::Bitboard;

#[allow(missing_docs)]
pub const BOARD_WIDTH: u8 = 8;
#[allow(missing_docs)]
pub const BOARD_SIZE: u8 = BOARD_WIDTH * BOARD_WIDTH;

/// Represents a column (vertical row) of the chessboard. In chess notation,
/// it is normally represented with a lowercase letter.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, strum::EnumIter)]
#[allow(missing_docs)]
pub enum File {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl File {
    /// Returns a bitboard with all squares of this file set.
    #[must_use]
    pub const fn mask(self) -> Bitboard {
        Bitboard::from_bits(0x0101_0101_0101_0101 << self as u8)
    }
}

impl TryFrom<char> for File {
    type Error = anyhow::Error;

    fn try_from(file: char) -> anyhow::Result<Self> {
        match file {
            'a'..='h' => Ok(unsafe { mem::transmute::<u8, Self>(file as u8 - b'a') }),
            _ => bail!("unknown file: expected within 'a'..='h', got '{file}'"),
        }
    }
}

impl TryFrom<u8> for File {
    type Error = anyhow::Error;

    fn try_from(column: u8) -> anyhow::Result<Self> {
        match column {
            0..=7 => Ok(unsafe { mem::transmute::<u8, Self>(column) }),
            _ => bail!("unknown file: expected within 0..BOARD_WIDTH, got {column}"),
        }
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", (b'a' + *self as u8) as char)
    }
}

/// Represents a horizontal row of the chessboard. In chess notation, it is
/// represented with a number. The implementation assumes zero-based values
/// (i.e. rank 1 would be 0).
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, strum::EnumIter)]
#[allow(missing_docs)]
pub enum Rank {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
}

impl Rank {
    /// Returns a bitboard with all squares of this rank set.
    #[must_use]
    pub const fn mask(self) -> Bitboard {
        Bitboard::from_bits(0xFF << (self as u8 * BOARD_WIDTH))
    }

    /// Returns the rank where the pawns of `player` start.
    #[must_use]
    pub const fn pawns_starting(player: Player) -> Self {
        match player {
            Player::White => Self::Two,
            Player::Black => Self::Seven,
        }
    }

    /// Returns the rank a pawn of `player` stands on right before promoting.
    #[must_use]
    pub const fn pawns_promoting(player: Player) -> Self {
        match player {
            Player::White => Self::Seven,
            Player::Black => Self::Two,
        }
    }

    /// Returns the backrank of `player`, i.e. the rank its pieces start on.
    #[must_use]
    pub const fn backrank(player: Player) -> Self {
        match player {
            Player::White => Self::One,
            Player::Black => Self::Eight,
        }
    }
}

impl TryFrom<char> for Rank {
    type Error = anyhow::Error;

    fn try_from(rank: char) -> anyhow::Result<Self> {
        match rank {
            '1'..='8' => Ok(unsafe { mem::transmute::<u8, Self>(rank as u8 - b'1') }),
            _ => bail!("unknown rank: expected within '1'..='8', got '{rank}'"),
        }
    }
}

impl TryFrom<u8> for Rank {
    type Error = anyhow::Error;

    fn try_from(row: u8) -> anyhow::Result<Self> {
        match row {
            0..=7 => Ok(unsafe { mem::transmute::<u8, Self>(row) }),
            _ => bail!("unknown rank: expected within 0..BOARD_WIDTH, got {row}"),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", *self as u8 + 1)
    }
}

/// Board squares: from left to right, from bottom to the top:
///
/// ```
/// use tabiya::chess::core::Square;
///
/// assert_eq!(Square::A1 as u8, 0);
/// assert_eq!(Square::E1 as u8, 4);
/// assert_eq!(Square::H1 as u8, 7);
/// assert_eq!(Square::A4 as u8, 8 * 3);
/// assert_eq!(Square::H8 as u8, 63);
/// ```
///
/// Square is a compact representation using only one byte.
///
/// ```
/// use tabiya::chess::core::Square;
///
/// assert_eq!(std::mem::size_of::<Square>(), 1);
/// ```
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, strum::EnumIter)]
#[rustfmt::skip]
#[allow(missing_docs)]
pub enum Square {
    A1, B1, C1, D1, E1, F1, G1, H1,
    A2, B2, C2, D2, E2, F2, G2, H2,
    A3, B3, C3, D3, E3, F3, G3, H3,
    A4, B4, C4, D4, E4, F4, G4, H4,
    A5, B5, C5, D5, E5, F5, G5, H5,
    A6, B6, C6, D6, E6, F6, G6, H6,
    A7, B7, C7, D7, E7, F7, G7, H7,
    A8, B8, C8, D8, E8, F8, G8, H8,
}

impl Square {
    /// Connects file (column) and rank (row) to form a full square.
    #[must_use]
    pub fn new(file: File, rank: Rank) -> Self {
        unsafe { mem::transmute(file as u8 + (rank as u8) * BOARD_WIDTH) }
    }

    /// Returns file (column) on which the square is located.
    #[must_use]
    pub fn file(self) -> File {
        unsafe { mem::transmute(self as u8 % BOARD_WIDTH) }
    }

    /// Returns rank (row) on which the square is located.
    #[must_use]
    pub fn rank(self) -> Rank {
        unsafe { mem::transmute(self as u8 / BOARD_WIDTH) }
    }

    /// Returns the square shifted one step in `direction`, or [`None`] if
    /// that would leave the board.
    #[must_use]
    pub(in crate::chess) fn shift(self, direction: Direction) -> Option<Self> {
        match direction {
            Direction::UpRight | Direction::Right | Direction::DownRight => {
                if self.file() == File::H {
                    return None;
                }
            }
            Direction::UpLeft | Direction::Left | Direction::DownLeft => {
                if self.file() == File::A {
                    return None;
                }
            }
            _ => (),
        }
        let shift: i8 = match direction {
            Direction::Up => BOARD_WIDTH as i8,
            Direction::Down => -(BOARD_WIDTH as i8),
            Direction::Left => -1,
            Direction::Right => 1,
            Direction::UpLeft => BOARD_WIDTH as i8 - 1,
            Direction::UpRight => BOARD_WIDTH as i8 + 1,
            Direction::DownLeft => -(BOARD_WIDTH as i8 + 1),
            Direction::DownRight => -(BOARD_WIDTH as i8 - 1),
        };
        let candidate = self as i8 + shift;
        if candidate < 0 {
            return None;
        }
        Self::try_from(candidate as u8).ok()
    }
}

impl TryFrom<u8> for Square {
    type Error = anyhow::Error;

    /// Creates a square given its position on the board.
    ///
    /// # Errors
    ///
    /// If given square index is outside 0..[`BOARD_SIZE`] range.
    fn try_from(square_index: u8) -> anyhow::Result<Self> {
        const MAX_INDEX: u8 = BOARD_SIZE - 1;
        match square_index {
            0..=MAX_INDEX => Ok(unsafe { mem::transmute::<u8, Self>(square_index) }),
            _ => bail!("unknown square index: needs to be in 0..BOARD_SIZE, got {square_index}"),
        }
    }
}

impl TryFrom<&str> for Square {
    type Error = anyhow::Error;

    fn try_from(square: &str) -> anyhow::Result<Self> {
        let mut chars = square.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(file), Some(rank), None) => {
                Ok(Self::new(file.try_into()?, rank.try_into()?))
            }
            _ => bail!("unknown square: should be two-char, got '{square}'"),
        }
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.file(), self.rank())
    }
}

/// A standard game of chess is played between two players: White (having the
/// advantage of the first turn) and Black.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Player {
    White,
    Black,
}

impl Player {
    /// Direction the pawns of this player move in.
    #[must_use]
    pub(in crate::chess) const fn push_direction(self) -> Direction {
        match self {
            Self::White => Direction::Up,
            Self::Black => Direction::Down,
        }
    }
}

impl std::ops::Not for Player {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

impl TryFrom<&str> for Player {
    type Error = anyhow::Error;

    fn try_from(player: &str) -> anyhow::Result<Self> {
        match player {
            "w" => Ok(Self::White),
            "b" => Ok(Self::Black),
            _ => bail!("unknown player: expected 'w' or 'b', got '{player}'"),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::White => 'w',
                Self::Black => 'b',
            }
        )
    }
}

/// Standard [chess pieces]. The discriminants match the piece-kind field of
/// the packed move encoding.
///
/// [chess pieces]: https://en.wikipedia.org/wiki/Chess_piece
#[allow(missing_docs)]
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    pub(in crate::chess) fn from_index(index: u8) -> Self {
        debug_assert!(index < 6);
        unsafe { mem::transmute(index) }
    }
}

/// Represents a specific piece owned by a player. Encoded in one of 12 slots
/// (White block 0..6, Black block 6..12) in the bitboard array of
/// [`crate::chess::position::Position`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Piece {
    #[allow(missing_docs)]
    pub player: Player,
    #[allow(missing_docs)]
    pub kind: PieceKind,
}

impl Piece {
    #[must_use]
    pub(in crate::chess) const fn new(player: Player, kind: PieceKind) -> Self {
        Self { player, kind }
    }

    /// Position of this piece's bitboard within the 12-slot array.
    #[must_use]
    pub(in crate::chess) const fn index(self) -> usize {
        self.player as usize * 6 + self.kind as usize
    }

    /// Algebraic notation symbol used in FEN. Uppercase for white, lowercase
    /// for black.
    pub(in crate::chess) fn algebraic_symbol(self) -> char {
        let result = match self.kind {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        };
        match self.player {
            Player::White => result.to_ascii_uppercase(),
            Player::Black => result,
        }
    }
}

impl TryFrom<char> for Piece {
    type Error = anyhow::Error;

    fn try_from(symbol: char) -> anyhow::Result<Self> {
        let kind = match symbol.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => bail!("unknown piece symbol: expected within \"KQRBNPkqrbnp\", got '{symbol}'"),
        };
        let player = if symbol.is_ascii_uppercase() {
            Player::White
        } else {
            Player::Black
        };
        Ok(Self { player, kind })
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.algebraic_symbol())
    }
}

bitflags::bitflags! {
    /// Tracks the ability to [castle] for both sides. When the king moves,
    /// the player loses the ability to castle to either side; when a rook
    /// moves or is captured, the player loses the ability to castle to its
    /// corresponding side.
    ///
    /// [castle]: https://www.chessprogramming.org/Castling
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CastleRights: u8 {
        #[allow(missing_docs)]
        const WHITE_SHORT = 0b0001;
        #[allow(missing_docs)]
        const WHITE_LONG = 0b0010;
        #[allow(missing_docs)]
        const BLACK_SHORT = 0b0100;
        #[allow(missing_docs)]
        const BLACK_LONG = 0b1000;
    }
}

impl CastleRights {
    /// Both rights of `player`.
    #[must_use]
    pub(in crate::chess) fn both(player: Player) -> Self {
        match player {
            Player::White => Self::WHITE_SHORT | Self::WHITE_LONG,
            Player::Black => Self::BLACK_SHORT | Self::BLACK_LONG,
        }
    }

    pub(in crate::chess) fn short(player: Player) -> Self {
        match player {
            Player::White => Self::WHITE_SHORT,
            Player::Black => Self::BLACK_SHORT,
        }
    }

    pub(in crate::chess) fn long(player: Player) -> Self {
        match player {
            Player::White => Self::WHITE_LONG,
            Player::Black => Self::BLACK_LONG,
        }
    }

    /// The right that the rook standing on its home square `square`
    /// guards, if any.
    pub(in crate::chess) fn of_rook_home(square: Square) -> Option<Self> {
        match square {
            Square::A1 => Some(Self::WHITE_LONG),
            Square::H1 => Some(Self::WHITE_SHORT),
            Square::A8 => Some(Self::BLACK_LONG),
            Square::H8 => Some(Self::BLACK_SHORT),
            _ => None,
        }
    }
}

impl TryFrom<&str> for CastleRights {
    type Error = anyhow::Error;

    /// Parses [`CastleRights`] for both players from the FEN format: a
    /// subset of "KQkq" or "-".
    fn try_from(fen: &str) -> anyhow::Result<Self> {
        if fen == "-" {
            return Ok(Self::empty());
        }
        if fen.is_empty() || fen.len() > 4 {
            bail!("unknown castling rights: expected 1..=4 symbols, got '{fen}'");
        }
        let mut result = Self::empty();
        for symbol in fen.chars() {
            result |= match symbol {
                'K' => Self::WHITE_SHORT,
                'Q' => Self::WHITE_LONG,
                'k' => Self::BLACK_SHORT,
                'q' => Self::BLACK_LONG,
                _ => bail!("unknown castling rights symbol: '{symbol}'"),
            };
        }
        Ok(result)
    }
}

impl fmt::Display for CastleRights {
    /// Prints castling rights of both sides in FEN format.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }
        for (bit, symbol) in [
            (Self::WHITE_SHORT, 'K'),
            (Self::WHITE_LONG, 'Q'),
            (Self::BLACK_SHORT, 'k'),
            (Self::BLACK_LONG, 'q'),
        ] {
            if self.contains(bit) {
                write!(f, "{symbol}")?;
            }
        }
        Ok(())
    }
}

/// Directions on the board from the perspective of the White player.
///
/// Using relative directions (up means towards rank 8) is more
/// straightforward to argue about than cardinal ones: White pawns push up,
/// Black pawns push down. Left means towards file a.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub(in crate::chess) enum Direction {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    pub(in crate::chess) const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::UpLeft => Self::DownRight,
            Self::UpRight => Self::DownLeft,
            Self::DownLeft => Self::UpRight,
            Self::DownRight => Self::UpLeft,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{CastleRights, Direction, File, Piece, PieceKind, Player, Rank, Square};

    #[test]
    fn rank() {
        assert_eq!(
            ('1'..='9')
                .filter_map(|ch| Rank::try_from(ch).ok())
                .collect::<Vec<Rank>>(),
            vec![
                Rank::One,
                Rank::Two,
                Rank::Three,
                Rank::Four,
                Rank::Five,
                Rank::Six,
                Rank::Seven,
                Rank::Eight,
            ]
        );
        assert!(Rank::try_from('0').is_err());
        assert!(Rank::try_from('9').is_err());
        assert!(Rank::try_from(8u8).is_err());
    }

    #[test]
    fn file() {
        assert_eq!(
            ('a'..='i')
                .filter_map(|ch| File::try_from(ch).ok())
                .collect::<Vec<File>>(),
            vec![
                File::A,
                File::B,
                File::C,
                File::D,
                File::E,
                File::F,
                File::G,
                File::H,
            ]
        );
        assert!(File::try_from('i').is_err());
        assert!(File::try_from(8u8).is_err());
    }

    #[test]
    fn masks() {
        assert_eq!(File::A.mask().count(), 8);
        assert_eq!(File::H.mask().bits(), 0x8080_8080_8080_8080);
        assert_eq!(Rank::One.mask().bits(), 0xFF);
        assert_eq!(Rank::Eight.mask().bits(), 0xFF00_0000_0000_0000);
        assert!((File::C.mask() & Rank::Four.mask()).contains(Square::C4));
    }

    #[test]
    fn square() {
        let squares: Vec<_> = [0u8, 63, 7, 8, 8 * 2 + 5, 64]
            .iter()
            .filter_map(|square| Square::try_from(*square).ok())
            .collect();
        assert_eq!(
            squares,
            vec![Square::A1, Square::H8, Square::H1, Square::A2, Square::F3]
        );
        assert_eq!(Square::new(File::B, Rank::Three), Square::B3);
        assert_eq!(Square::new(File::H, Rank::Eight), Square::H8);
        assert_eq!(Square::try_from("e4").unwrap(), Square::E4);
        assert_eq!(Square::E4.to_string(), "e4");
        assert!(Square::try_from("e9").is_err());
        assert!(Square::try_from("e44").is_err());
    }

    #[test]
    fn square_shift() {
        assert_eq!(Square::E4.shift(Direction::Up), Some(Square::E5));
        assert_eq!(Square::E4.shift(Direction::Down), Some(Square::E3));
        assert_eq!(Square::E4.shift(Direction::Left), Some(Square::D4));
        assert_eq!(Square::E4.shift(Direction::Right), Some(Square::F4));
        assert_eq!(Square::E4.shift(Direction::UpLeft), Some(Square::D5));
        assert_eq!(Square::E4.shift(Direction::UpRight), Some(Square::F5));
        assert_eq!(Square::E4.shift(Direction::DownLeft), Some(Square::D3));
        assert_eq!(Square::E4.shift(Direction::DownRight), Some(Square::F3));

        // Horizontal wrap-around must not happen.
        assert_eq!(Square::A4.shift(Direction::Left), None);
        assert_eq!(Square::A4.shift(Direction::UpLeft), None);
        assert_eq!(Square::A4.shift(Direction::DownLeft), None);
        assert_eq!(Square::H4.shift(Direction::Right), None);
        assert_eq!(Square::H4.shift(Direction::UpRight), None);
        assert_eq!(Square::H4.shift(Direction::DownRight), None);

        // Vertical edges.
        assert_eq!(Square::D1.shift(Direction::Down), None);
        assert_eq!(Square::D8.shift(Direction::Up), None);
        assert_eq!(Square::A1.shift(Direction::DownRight), None);
        assert_eq!(Square::H8.shift(Direction::UpLeft), None);
    }

    #[test]
    fn pieces() {
        let white_king = Piece::try_from('K').unwrap();
        assert_eq!(white_king.player, Player::White);
        assert_eq!(white_king.kind, PieceKind::King);
        assert_eq!(white_king.index(), 5);
        let black_pawn = Piece::try_from('p').unwrap();
        assert_eq!(black_pawn.player, Player::Black);
        assert_eq!(black_pawn.kind, PieceKind::Pawn);
        assert_eq!(black_pawn.index(), 6);
        assert_eq!(black_pawn.to_string(), "p");
        assert_eq!(white_king.to_string(), "K");
        assert!(Piece::try_from('x').is_err());
    }

    #[test]
    fn castle_rights() {
        assert_eq!(CastleRights::try_from("-").unwrap(), CastleRights::empty());
        assert_eq!(CastleRights::try_from("KQkq").unwrap(), CastleRights::all());
        assert_eq!(
            CastleRights::try_from("Kq").unwrap(),
            CastleRights::WHITE_SHORT | CastleRights::BLACK_LONG
        );
        assert_eq!(CastleRights::all().to_string(), "KQkq");
        assert_eq!(CastleRights::empty().to_string(), "-");
        assert_eq!(
            CastleRights::both(Player::Black).to_string(),
            "kq"
        );
        assert!(CastleRights::try_from("KQxq").is_err());
        assert!(CastleRights::try_from("").is_err());

        assert_eq!(
            CastleRights::of_rook_home(Square::H1),
            Some(CastleRights::WHITE_SHORT)
        );
        assert_eq!(CastleRights::of_rook_home(Square::E4), None);
    }

    #[test]
    fn player_negation() {
        assert_eq!(!Player::White, Player::Black);
        assert_eq!(!Player::Black, Player::White);
    }
}
