//! VoxOver - AI Narration Studio
//!
//! Generates a narration script for a video with a text-generation API,
//! lets the user revise it, synthesizes it with one of ten voices and mixes
//! the speech with the video's own audio using ffmpeg.

pub mod cli;
pub mod config;
pub mod delivery;
pub mod error;
pub mod ingest;
pub mod media;
pub mod mixer;
pub mod narration;
pub mod script;
pub mod speech;
pub mod workflow;

#[cfg(test)]
mod testing;
