pub mod logging;
pub mod registry;
pub mod storage;
