pub mod debounce;
pub mod location;
pub mod state;

pub use debounce::CoalescingTimer;
pub use location::{
    LocationAdapter, LocationBackend, LocationQuery, MemoryLocation, SyncToken, WriteMode,
};
pub use state::{breadcrumbs_for, Breadcrumb, LocationChange, NavigationState};
