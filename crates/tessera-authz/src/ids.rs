// Strongly typed IDs so a group id can never be passed where a user id belongs.
use crate::AuthzError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[cfg_attr(
            feature = "openapi",
            derive(utoipa::ToSchema),
            schema(value_type = String, format = Uuid)
        )]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = AuthzError;

            fn from_str(input: &str) -> Result<Self, Self::Err> {
                let uuid =
                    Uuid::parse_str(input).map_err(|_| AuthzError::InvalidId(input.into()))?;
                Ok(Self(uuid))
            }
        }
    };
}

id_type!(UserId);
id_type!(ConnectionId);
id_type!(DataSourceId);
id_type!(DashboardId);
id_type!(ShareId);
id_type!(GroupId);
id_type!(ChartId);
