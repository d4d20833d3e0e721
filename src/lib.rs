//! ieee802154-sniffer library — portable capture core.
//!
//! Tracks the radio's power/receive state, validates channel selection,
//! and turns received 802.15.4 frames into reports. Everything here is
//! free of platform dependencies and testable on any host with
//! `cargo test`; the ESP32-C6/H2 firmware binary is a thin consumer that
//! adapts the chip's radio driver to [`radio::Radio`] and feeds frames to a
//! [`capture::CaptureSink`].
//!
//! Modules:
//! - `channel`, `radio`, `config` — channel selection and the radio state
//!   machine.
//! - `frame`, `capture`, `protocol` — frame records, text reports and the
//!   NDJSON stream.
//! - `console`, `board` — the command-line facade and chip constants.

#![cfg_attr(not(test), no_std)]

pub mod board;
pub mod capture;
pub mod channel;
pub mod config;
pub mod console;
pub mod frame;
pub mod protocol;
pub mod radio;
