//! Route paths.

pub const HEALTH: &str = "/health";

pub const USERS: &str = "/users";
pub const USERS_ID: &str = "/users/{id}";
pub const USERS_REGISTER: &str = "/users/register";
pub const USERS_LOGIN: &str = "/users/login";
pub const USERS_LOGOUT: &str = "/users/logout";
pub const USERS_FACEBOOK: &str = "/users/facebook";
pub const USERS_FACEBOOK_CALLBACK: &str = "/users/facebook/callback";

pub const CITY: &str = "/city";
pub const CITY_ID: &str = "/city/{id}";

pub const MEDIA: &str = "/media";
pub const MEDIA_ID: &str = "/media/{id}";
pub const MEDIA_METADATA_ID: &str = "/media/metadata/{id}";
