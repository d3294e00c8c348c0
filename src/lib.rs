//! Bitboard-based chess position representation and fully legal move
//! generation.
//!
//! The crate provides a [`chess::position::Position`] that can be created
//! from FEN, mutated through make/unmake (with incremental
//! Polyglot-compatible Zobrist hashing), and asked for the exact set of
//! legal moves in the position. Move generation is legal-by-construction:
//! pins, checks and king safety are resolved with bitboard masks before a
//! single move is emitted, so no generate-then-filter pass is needed.

// Rustc lints.
#![warn(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_lifetimes,
    unused_qualifications
)]
// Clippy lints.
#![warn(
    clippy::correctness,
    clippy::suspicious,
    clippy::style,
    clippy::complexity
)]
// Performance is extremely important.
#![deny(clippy::perf)]

pub mod chess;
