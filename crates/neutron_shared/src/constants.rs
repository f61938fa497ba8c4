//! # Shared Constants
//!
//! Values both sides must agree on. Changing any of them changes every
//! generated wire name, so server and client builds must be updated together.

// =============================================================================
// ENDPOINT NAMING
// =============================================================================

/// Host attribute the server writes its naming seed into.
pub const SEED_ATTRIBUTE: &str = "NeutronSeed";

/// Number of code points in a generated wire name (before any suffix).
pub const DEFAULT_NAME_LENGTH: usize = 16;

/// Lowest code point a generated wire name may contain (`!`).
pub const DEFAULT_MIN_CODE_POINT: u32 = 33;

/// Highest code point a generated wire name may contain (`~`).
pub const DEFAULT_MAX_CODE_POINT: u32 = 126;

// =============================================================================
// LIFECYCLES
// =============================================================================

/// Default rate of the built-in tick lifecycle (fires per second).
pub const DEFAULT_TICK_RATE: u32 = 60;
