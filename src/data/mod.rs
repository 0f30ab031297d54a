pub mod alert;
pub mod group;
pub mod silence;

pub use alert::{Alert, AlertState, Annotation, InstanceView};
pub use group::AlertGroup;
pub use silence::{Silence, SilenceMatcher};
