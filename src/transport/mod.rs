pub mod channel;
pub mod shared;
pub mod snapshot;

pub use channel::{spawn, spawn_context, SimCommand, SimHandle};
pub use shared::SharedRegion;
pub use snapshot::{Snapshot, VesselRecord, LAYOUT_VERSION, RECORD_SLOTS};
