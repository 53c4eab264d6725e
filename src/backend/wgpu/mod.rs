pub mod bindings;
pub mod config;
pub mod dispatch;
pub mod executor;
pub mod params;
pub mod pipelines;
pub mod shaders;
pub mod types;

pub use executor::{
    DeviceComplexBuffer, DeviceMultiplyIo, DeviceSplitBuffer, DeviceStrideTable, DeviceTwiddles,
    WgpuExecutor, WgpuExecutorOptions,
};
pub use types::NumericPrecision;
