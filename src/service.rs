pub mod bench;
pub mod dialer;
pub mod geoip;
pub mod loader;
pub mod pipeline;
pub mod stats;
pub mod throughput;
pub mod unlock;
