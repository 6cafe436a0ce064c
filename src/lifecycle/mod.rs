//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     AppConfig + client + storage → ConnectionFactory → MetricsFanout → Heartbeat
//!     config path → ConnectionWatcher → connection updates
//!
//! Driver (driver.rs):
//!     tick → Heartbeat::beat()
//!     connection update → ConnectionFactory::apply_settings()
//!     DriverHandle::stop() → Heartbeat::close()
//! ```

pub mod driver;
pub mod startup;

pub use driver::{DriverHandle, HeartbeatDriver};
pub use startup::{build_services, watch_connection_config, Services};
