/// State management module
///
/// This module handles all session state, including:
/// - The in-memory avatar and its per-category selections (avatar.rs)
/// - The user's local accessory catalog (registry.rs)
/// - Token and record storage on disk (session.rs)

pub mod avatar;
pub mod registry;
pub mod session;
