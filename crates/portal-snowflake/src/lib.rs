mod clock;
pub mod error;
mod snowflake;
mod snowflake_id;

pub use clock::{Clock, SystemClock};
pub use error::Error;
pub use snowflake::{Snowflake, SnowflakeSettings, DEFAULT_EPOCH, MAX_NODE_ID};
pub use snowflake_id::SnowflakeId;
