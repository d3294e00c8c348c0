//! FEN reader/writer integration tests: round trips of valid positions and
//! rejection of malformed or illegal input.

use pretty_assertions::assert_eq;
use tabiya::chess::position::Position;

#[must_use]
fn sanitize_fen(position: &str) -> String {
    let mut position = position.trim();
    for prefix in ["fen ", "epd "] {
        if let Some(stripped) = position.strip_prefix(prefix) {
            position = stripped;
        }
    }
    match position.split_ascii_whitespace().count() {
        6 => position.to_string(),
        // Patch EPD to validate the produced FEN.
        4 => position.to_string() + " 0 1",
        _ => unreachable!(),
    }
}

fn expect_legal_position(input: &str) {
    let position = Position::try_from(input).expect("we are parsing a valid position");
    assert_eq!(position.to_string(), sanitize_fen(input));
}

#[test]
fn basic_positions() {
    // Full FEN.
    expect_legal_position("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    expect_legal_position("2r3r1/p3k3/1p3pp1/1B5p/5P2/2P1p1P1/PP4KP/3R4 w - - 0 34");
    expect_legal_position(
        "r2qkb1r/1pp1pp1p/p1np1np1/1B6/3PP1b1/2N1BN2/PPP2PPP/R2QK2R w KQkq - 0 7",
    );
    expect_legal_position("r3k3/5p2/2p5/p7/P3r3/2N2n2/1PP2P2/2K2B2 w q - 0 24");
    expect_legal_position("r1b1qrk1/ppp2pbp/n2p1np1/4p1B1/2PPP3/2NB1N1P/PP3PP1/R2QK2R w KQ - 0 9");
    // A playable en-passant square survives the round trip.
    expect_legal_position("rnbqkbnr/ppp1pppp/8/8/2pP4/5N2/PP2PPPP/RNBQKB1R b KQkq d3 0 3");
    // Trimmed (EPD-style) FEN.
    expect_legal_position("rnbqkb1r/pp2pppp/3p1n2/8/3NP3/2N5/PPP2PPP/R1BQKB1R b KQkq -");
    // Prefixes used by UCI "position fen" bookkeeping are tolerated.
    expect_legal_position("fen rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    expect_legal_position("epd rnbqkb1r/pp2pppp/3p1n2/8/3NP3/2N5/PPP2PPP/R1BQKB1R b KQkq -");
}

// The en-passant field is honoured only when the capture is playable;
// phantom opportunities are dropped so transpositions hash identically.
#[test]
fn phantom_en_passant_square_is_dropped() {
    let position =
        Position::from_fen("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2")
            .expect("valid position");
    assert_eq!(position.en_passant_square(), None);
    assert_eq!(
        position.to_string(),
        "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2"
    );
}

#[test]
fn missing_fields_are_rejected() {
    for fen in [
        "",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0",
    ] {
        assert!(Position::from_fen(fen).is_err(), "accepted: {fen:?}");
    }
}

#[test]
fn malformed_placements_are_rejected() {
    for fen in [
        // Unknown piece symbol.
        "rnbqkbnr/ppppXppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        // Rank too wide.
        "rnbqkbnr/ppppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        // Rank too narrow.
        "rnbqkbnr/ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        // Not enough ranks.
        "rnbqkbnr/pppppppp/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        // Too many ranks.
        "rnbqkbnr/pppppppp/8/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    ] {
        assert!(Position::from_fen(fen).is_err(), "accepted: {fen:?}");
    }
}

#[test]
fn illegal_positions_are_rejected() {
    for fen in [
        // No white king.
        "3k4/8/8/8/8/8/8/8 w - - 0 1",
        // No black king.
        "8/8/8/8/8/8/8/3K4 w - - 0 1",
        // Too many kings.
        "1kkk4/8/8/8/8/8/8/1KKK4 w - - 0 1",
        // Nine white pawns.
        "rnbqkbnr/pppppppp/8/8/8/P7/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        // Pawn on a backrank.
        "3kP3/8/8/8/8/8/8/1K6 w - - 0 1",
        // En-passant square on the wrong rank.
        "rnbqkbnr/ppp1pppp/8/3p4/8/2P5/PP1PPPPP/RNBQKBNR w KQkq d4 0 2",
        // Fullmove counter of zero.
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 0",
    ] {
        assert!(Position::from_fen(fen).is_err(), "accepted: {fen:?}");
    }
}

#[test]
fn garbage_is_rejected() {
    for input in [
        "duck chess",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 trailing",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR u KQkq - 0 1",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KXkq - 0 1",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e9 0 1",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - x 1",
    ] {
        assert!(Position::try_from(input).is_err(), "accepted: {input:?}");
    }
}

#[test]
fn canonical_polyglot_key() {
    let position = Position::starting();
    assert_eq!(position.hash(), 0x463b_9618_1691_fc9c);
}
