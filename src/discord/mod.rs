mod presence;

pub use presence::DiscordConnector;
