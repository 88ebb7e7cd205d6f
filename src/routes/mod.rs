/// Router Module Index
///
/// Two trees with different access rules, kept in separate modules so the rule is
/// applied once, at the module boundary.

/// Anonymous, read-only website API. Published rows only.
pub mod public;

/// The `/admin` tree, mounted behind the role gate.
pub mod admin;
