//! Portal data model.
//!
//! # Purpose
//! Document shapes persisted by the stores and returned by the API. Wire
//! field names are camelCase. Records that carry secrets (`UserRecord`,
//! `ConnectionRecord`) have a separate public view without them.
mod connection;
mod dashboard;
mod data_source;
mod group;
mod share;
mod user;

pub use connection::{ConnectionRecord, DatabaseConnection, DatabaseType};
pub use dashboard::{ChartConfig, ChartPosition, Dashboard};
pub use data_source::{ColumnMetadata, DataSource};
pub use group::Group;
pub use share::DashboardShare;
pub use user::{User, UserRecord};
pub(crate) use user::normalize_email;
