//! HTTP Routes

pub mod download;
pub mod spikedata;
pub mod stations;
