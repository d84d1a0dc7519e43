pub mod app_state;
pub mod messages;
pub mod network;
pub mod refresher;
pub mod tracker;

#[cfg(test)]
pub mod test_support;
