pub mod traits;
pub mod notifiers;
pub mod formatting;

pub use traits::{Notifier, NotifierBox};
