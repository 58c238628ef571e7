//! Visibility Observation Fallback
//!
//! Stands in for native intersection observation on hosts that lack it.

mod geometry;
mod margin;
mod observer;
mod throttle;

pub use geometry::Rect;
pub use margin::{MarginError, MarginLength, RootMargin};
pub use observer::{
    ElementId, EventSource, GeometrySource, HostEvent, ListenerId, ObserverConfig,
    PollingObserver, VisibilityCallback, VisibilityEntry, VisibilityObserver,
};
pub use throttle::Throttle;
