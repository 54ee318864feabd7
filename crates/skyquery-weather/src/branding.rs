//! Attribution fields added to every freshly fetched result.

use serde_json::Value;
use skyquery_cache::Payload;

pub const LIGHT_LOGO_KEY: &str = "lightLogo";
pub const DARK_LOGO_KEY: &str = "darkLogo";

/// Attribution badge for light backgrounds
pub const LIGHT_LOGO: &str = r#"<a href="https://www.yahoo.com/?ilc=401" target="_blank"> <img src="https://poweredby.yahoo.com/purple.png" width="134" height="29"/> </a>"#;

/// Attribution badge for dark backgrounds
pub const DARK_LOGO: &str = r#"<a href="https://www.yahoo.com/?ilc=401" target="_blank"> <img src="https://poweredby.yahoo.com/white.png" width="134" height="29"/> </a>"#;

/// Add the attribution fields to a result. Keys the service already sent win.
pub fn augment(mut payload: Payload) -> Payload {
    for (key, value) in [(LIGHT_LOGO_KEY, LIGHT_LOGO), (DARK_LOGO_KEY, DARK_LOGO)] {
        payload
            .entry(key)
            .or_insert_with(|| Value::String(value.to_string()));
    }
    payload
}
