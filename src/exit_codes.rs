pub const SUCCESS: i32 = 0;
pub const CONFIG_ERROR: i32 = 2;
pub const SESSION_ERROR: i32 = 3;
