pub mod odds;

pub use odds::api_router;
