//! Typed message families.

pub mod ac_error_info;
pub mod console_version;
pub mod group_names;
pub mod zone_status;

pub use ac_error_info::{AcErrorInformation, AcErrorInformationCodec};
pub use console_version::{ConsoleVersion, ConsoleVersionCodec};
pub use group_names::{GroupNames, GroupNamesCodec, GroupSelector, GROUP_NAME_LENGTH};
pub use zone_status::{
    SensorBatteryStatus, ZoneControlMethod, ZonePowerState, ZoneStatus, ZoneStatusCodec,
    ZoneStatusData,
};
