// ABOUTME: Release state marker types for the type state pattern.
// ABOUTME: Zero-sized types enforce the build order of a release at compile time.

/// Release directory cloned at the release tag.
/// Available actions: `link_shared()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Cloned;

/// Shared paths linked into the release.
/// Available actions: `upload()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Linked;

/// Local files uploaded into the release.
/// Available actions: `run_hooks()`, `activate()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Uploaded;

/// Current link points at this release.
/// Available actions: `fix_permissions()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Active;
