mod app_router;
pub mod pipeline;

pub use app_router::AppRouter;
