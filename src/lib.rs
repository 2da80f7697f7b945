//! Wavebar - animated waveform menu-bar icon for a speech-to-text utility
//!
//! This library exports the icon renderer and its plumbing for testing and reuse.

/// Meter sources (microphone, WAV replay, synthetic)
pub mod audio;
/// Configuration management
pub mod config;
/// Icon event loop
pub mod controller;
/// Waveform icon geometry and rasterization
pub mod icon;
/// Frame sinks
pub mod surface;
/// Logging setup
pub mod telemetry;
/// System tray surface
pub mod tray;
