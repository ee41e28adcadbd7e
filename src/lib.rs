pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod protocol;

pub use config::DeviceConfig;
pub use device::Device;
pub use error::{Result, WeheadError};
pub use image::RgbImage;
pub use protocol::Voice;
