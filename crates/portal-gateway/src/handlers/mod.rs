mod health;
mod links;
mod redirect;

pub use health::health_handler;
pub use links::{
    batch_create_handler, create_link_handler, delete_link_handler, disable_link_handler,
    get_link_handler, link_daily_stats_handler, link_stats_handler, list_links_handler,
    update_link_handler,
};
pub use redirect::redirect_handler;
