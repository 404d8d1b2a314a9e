//! City Simulation Library
//!
//! A grid-based city simulator: procedural road/zoning generation, a derived
//! road-segment graph, per-class agent routing and movement, and a city-wide
//! economic and political model. Runs headless; rendering and UI are external
//! consumers of the exposed state.

pub mod simulation;
