//! Request handlers for the admin API.

pub mod events;
pub mod status;
pub mod subscribers;

pub use events::emit_event;
pub use status::get_status;
pub use subscribers::{
    create_subscriber, delete_subscriber, list_subscribers, test_subscriber, update_subscriber,
};
