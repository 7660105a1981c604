//! The runtime half of the task engine: the Cluster API Adapter, the
//! seven task implementations, the Task Factory, and the Engine Driver.
//! Everything here does real (or simulated) cluster I/O; the
//! I/O-free building blocks live in `engine-core`.

pub mod adapter;
pub mod driver;
pub mod factory;
pub mod tasks;

pub use adapter::{ClusterAdapter, KubeAdapter, NodeInfo, PodEvent, PodEventStream, PodStatus, SimAdapter, Taint};
pub use driver::Driver;
pub use factory::Factory;
pub use tasks::Runnable;
