use std::sync::Arc;

use parley_db::Database;
use parley_gateway::feed::ChannelFeed;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub feed: ChannelFeed,
}
