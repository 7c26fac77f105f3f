/// Remote sync module
///
/// This module handles all traffic with the avatar service:
/// - Authenticated fetch/save of the avatar configuration (client.rs)
/// - Preview, thumbnail and post-save image URL building (urls.rs)

pub mod client;
pub mod urls;
