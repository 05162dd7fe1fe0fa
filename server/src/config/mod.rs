mod bot_config;
mod snake_config;

pub use bot_config::get_config_manager;
pub use snake_config::SnakeConfig;
