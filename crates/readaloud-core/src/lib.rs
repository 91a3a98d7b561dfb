//! Core of the read-aloud client: chunking page text, requesting speech for
//! each chunk, buffering the results and sequencing playback.
//!
//! Nothing in here touches a terminal or an audio device directly; the
//! binary plugs those in through [`audio::AudioOutput`],
//! [`presentation::PresentationAdapter`] and [`document::PageSource`].

pub mod audio;
pub mod cache;
pub mod chunker;
pub mod config;
pub mod controller;
pub mod document;
pub mod engines;
pub mod presentation;
pub mod queue;
pub mod synthesis;

#[cfg(test)]
pub(crate) mod testing;
