// Room routing core
//
// A single task owns the connection registry and applies commands in order;
// everything else talks to it through a RouterHandle.

pub use dispatcher::{EventDispatcher, Flow};
pub use events::{RouterCommand, RouterStats};
pub use handlers::{health_check, room_members};
pub use room_router::RoomRouter;
pub use service::{spawn_router, RouterError, RouterHandle};

mod dispatcher;
mod events;
mod handlers;
mod room_router;
mod service;
