//! # cropwatch-entity
//!
//! Domain models shared by every CropWatch crate, plus the narrow
//! interfaces through which the fanout engine reaches its external
//! collaborators (user directory, notification store, token store,
//! and the delivery broker).

pub mod alert;
pub mod geo;
pub mod notification;
pub mod traits;
pub mod user;

pub use alert::{Alert, Severity};
pub use geo::{Candidate, GeoPoint, InvalidCoordinates};
pub use notification::{DeliveryPayload, Notification, NotificationType};
pub use traits::{ApiTokenStore, NotificationPublisher, NotificationStore, UserDirectory};
pub use user::UserLocation;
