pub const APP_NAME: &str = "recivault-backend";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const TITLE_MAX_LENGTH: usize = 50;
pub const DESCRIPTION_MAX_LENGTH: usize = 500;
pub const UNIT_MAX_LENGTH: usize = 50;
pub const INGREDIENT_MAX_LENGTH: usize = 200;
pub const WORKSTEP_MAX_LENGTH: usize = 500;
pub const TAG_MAX_LENGTH: usize = 20;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
