//! Resolvers (C5, C6). Map external identifiers from the upstream sources to
//! internal surrogate keys, maintaining the process-wide team and player
//! caches for the lifetime of the process.

pub mod season;
pub mod team_player;

pub use season::SeasonResolver;
pub use team_player::TeamPlayerResolver;
