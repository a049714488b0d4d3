//! Application services that sit between the routes and the API client.

pub mod cart_sync;

pub use cart_sync::{reconcile_after_login, sync_guest_cart, SyncReport};
