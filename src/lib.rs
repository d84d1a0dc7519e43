//! Settings shared by the `scorecast` and `espn-relay` binaries.

pub mod app_settings;
