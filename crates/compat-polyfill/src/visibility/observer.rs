//! Polling Visibility Observer
//!
//! Recomputes element visibility from geometry on throttled scroll and
//! resize events. All observed elements share one scroll and one resize
//! listener per observer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::geometry::Rect;
use super::margin::{MarginError, RootMargin};
use super::throttle::Throttle;

/// Host element handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

/// Host events the observer listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEvent {
    Scroll,
    Resize,
}

/// Handle for a registered host listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Host event registration
///
/// The host routes events for a registered listener to
/// [`PollingObserver::on_scroll`] / [`PollingObserver::on_resize`].
pub trait EventSource: Send + Sync {
    fn add_listener(&self, event: HostEvent) -> ListenerId;
    fn remove_listener(&self, listener: ListenerId);
}

/// Host layout queries
pub trait GeometrySource: Send + Sync {
    /// Root (viewport) bounds
    fn root_bounds(&self) -> Rect;
    /// Current bounding box of `target`; `None` once it has left the document
    fn bounding_rect(&self, target: ElementId) -> Option<Rect>;
}

/// observe/unobserve/disconnect contract shared with the native observer
pub trait VisibilityObserver {
    fn observe(&mut self, target: ElementId);
    fn unobserve(&mut self, target: ElementId);
    fn disconnect(&mut self);
}

/// One visibility transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityEntry {
    pub target: ElementId,
    pub bounding_rect: Rect,
    pub intersection_rect: Rect,
    pub root_bounds: Rect,
    pub intersection_ratio: f64,
    pub is_intersecting: bool,
    pub time: f64,
}

pub type VisibilityCallback = Box<dyn FnMut(&[VisibilityEntry]) + Send>;

/// Observer options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObserverConfig {
    /// Margin shorthand around the root
    pub root_margin: String,
    #[serde(with = "compat_env::millis")]
    pub scroll_throttle: Duration,
    #[serde(with = "compat_env::millis")]
    pub resize_throttle: Duration,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            root_margin: "0px".to_string(),
            scroll_throttle: Duration::from_millis(100),
            resize_throttle: Duration::from_millis(250),
        }
    }
}


/// Fallback observer built on scroll/resize polling
pub struct PollingObserver {
    events: Arc<dyn EventSource>,
    geometry: Arc<dyn GeometrySource>,
    callback: VisibilityCallback,
    margin: RootMargin,
    /// Registration order; `true` while intersecting
    observed: Vec<(ElementId, bool)>,
    listeners: Option<[ListenerId; 2]>,
    check_scheduled: bool,
    scroll: Throttle,
    resize: Throttle,
}

impl PollingObserver {
    pub fn new(
        events: Arc<dyn EventSource>,
        geometry: Arc<dyn GeometrySource>,
        config: &ObserverConfig,
        callback: VisibilityCallback,
    ) -> Result<Self, MarginError> {
        Ok(Self {
            events,
            geometry,
            callback,
            margin: RootMargin::parse(&config.root_margin)?,
            observed: Vec::new(),
            listeners: None,
            check_scheduled: false,
            scroll: Throttle::new(config.scroll_throttle),
            resize: Throttle::new(config.resize_throttle),
        })
    }

    pub fn root_margin(&self) -> &RootMargin {
        &self.margin
    }

    pub fn is_observing(&self, target: ElementId) -> bool {
        self.observed.iter().any(|(id, _)| *id == target)
    }

    pub fn observed_count(&self) -> usize {
        self.observed.len()
    }

    pub fn has_listeners(&self) -> bool {
        self.listeners.is_some()
    }

    /// Host scroll event
    pub fn on_scroll(&mut self, now: f64) {
        if !self.observed.is_empty() && self.scroll.trigger(now) {
            self.recompute(now);
        }
    }

    /// Host resize event
    pub fn on_resize(&mut self, now: f64) {
        if !self.observed.is_empty() && self.resize.trigger(now) {
            self.recompute(now);
        }
    }

    /// Run scheduled checks and any coalesced trailing recompute.
    ///
    /// Hosts call this from their frame or timer loop.
    pub fn tick(&mut self, now: f64) {
        let scroll_due = self.scroll.take_due(now);
        let resize_due = self.resize.take_due(now);
        if self.check_scheduled || scroll_due || resize_due {
            self.recompute(now);
        }
    }

    /// True if `tick` has work to do now or later
    pub fn has_pending_work(&self) -> bool {
        self.check_scheduled || self.scroll.is_pending() || self.resize.is_pending()
    }

    fn attach_listeners(&mut self) {
        if self.listeners.is_none() {
            let scroll = self.events.add_listener(HostEvent::Scroll);
            let resize = self.events.add_listener(HostEvent::Resize);
            self.listeners = Some([scroll, resize]);
            debug!("Polling observer attached shared listeners");
        }
    }

    fn detach_listeners(&mut self) {
        if let Some(listeners) = self.listeners.take() {
            for listener in listeners {
                self.events.remove_listener(listener);
            }
            self.scroll.reset();
            self.resize.reset();
            debug!("Polling observer detached shared listeners");
        }
    }

    fn recompute(&mut self, now: f64) {
        self.check_scheduled = false;
        if self.observed.is_empty() {
            return;
        }

        let root_bounds = self.geometry.root_bounds();
        let root = self.margin.apply(&root_bounds);
        let mut entries = Vec::new();

        for (target, intersecting) in &mut self.observed {
            // An element without a layout box has left the document
            let (rect, (is_intersecting, intersection_rect, ratio)) =
                match self.geometry.bounding_rect(*target) {
                    Some(rect) => (rect, measure(&rect, &root)),
                    None => {
                        trace!(?target, "Observed element has no layout box");
                        (Rect::default(), (false, Rect::default(), 0.0))
                    }
                };

            if is_intersecting != *intersecting {
                *intersecting = is_intersecting;
                entries.push(VisibilityEntry {
                    target: *target,
                    bounding_rect: rect,
                    intersection_rect,
                    root_bounds,
                    intersection_ratio: ratio,
                    is_intersecting,
                    time: now,
                });
            }
        }

        if !entries.is_empty() {
            (self.callback)(&entries);
        }
    }
}

/// Intersecting state, intersection rect and ratio of `rect` against `root`
fn measure(rect: &Rect, root: &Rect) -> (bool, Rect, f64) {
    if rect.area() == 0.0 {
        // Degenerate boxes count as fully visible while inside the root
        return if rect.is_within(root) {
            (true, *rect, 1.0)
        } else {
            (false, Rect::default(), 0.0)
        };
    }

    match rect.intersect(root) {
        Some(overlap) => (true, overlap, (overlap.area() / rect.area()).min(1.0)),
        None => (false, Rect::default(), 0.0),
    }
}

impl VisibilityObserver for PollingObserver {
    fn observe(&mut self, target: ElementId) {
        if self.is_observing(target) {
            return;
        }
        self.observed.push((target, false));
        self.attach_listeners();
        self.check_scheduled = true;
    }

    fn unobserve(&mut self, target: ElementId) {
        self.observed.retain(|(id, _)| *id != target);
        if self.observed.is_empty() {
            self.check_scheduled = false;
            self.detach_listeners();
        }
    }

    fn disconnect(&mut self) {
        self.observed.clear();
        self.check_scheduled = false;
        self.detach_listeners();
    }
}

impl Drop for PollingObserver {
    fn drop(&mut self) {
        self.detach_listeners();
    }
}

impl fmt::Debug for PollingObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingObserver")
            .field("margin", &self.margin)
            .field("observed", &self.observed)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
