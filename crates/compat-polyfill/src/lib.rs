//! fOS Compat Polyfill
//!
//! Behavior-equivalent stand-ins for platform APIs the host lacks:
//! visibility observation, multipart form encoding and constraint
//! validation. Each one mirrors the native contract so callers can swap
//! implementations without changing call sites.

pub mod form_data;
pub mod validation;
pub mod visibility;

pub use form_data::{EncodedForm, FilePart, FormDataError, FormDataSink, FormValue, MultipartForm};
pub use validation::{
    FieldConstraints, FieldDecorator, FormValidator, InputType, RuleKey, RuleKind, SubmitOutcome,
    ValidationError, ValidationRule, ERROR_CLASS,
};
pub use visibility::{
    ElementId, EventSource, GeometrySource, HostEvent, ListenerId, MarginError, MarginLength,
    ObserverConfig, PollingObserver, Rect, RootMargin, Throttle, VisibilityCallback,
    VisibilityEntry, VisibilityObserver,
};
