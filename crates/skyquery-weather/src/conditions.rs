//! Condition code lookup table.

const CONDITIONS: [&str; 48] = [
    "tornado",
    "tropical storm",
    "hurricane",
    "severe thunderstorms",
    "thunderstorms",
    "mixed rain and snow",
    "mixed rain and sleet",
    "mixed snow and sleet",
    "freezing drizzle",
    "drizzle",
    "freezing rain",
    "showers",
    "showers",
    "snow flurries",
    "light snow showers",
    "blowing snow",
    "snow",
    "hail",
    "sleet",
    "dust",
    "foggy",
    "haze",
    "smoky",
    "blustery",
    "windy",
    "cold",
    "cloudy",
    "mostly cloudy (night)",
    "mostly cloudy (day)",
    "partly cloudy (night)",
    "partly cloudy (day)",
    "clear (night)",
    "sunny",
    "fair (night)",
    "fair (day)",
    "mixed rain and hail",
    "hot",
    "isolated thunderstorms",
    "scattered thunderstorms",
    "scattered thunderstorms",
    "scattered showers",
    "heavy snow",
    "scattered snow showers",
    "heavy snow",
    "partly cloudy",
    "thundershowers",
    "snow showers",
    "isolated thundershowers",
];

/// Code the service uses when it has no condition to report
pub const NOT_AVAILABLE: u32 = 3200;

/// Text for a numeric condition code, if the code is known.
pub fn condition_text(code: u32) -> Option<&'static str> {
    if code == NOT_AVAILABLE {
        return Some("not available");
    }
    usize::try_from(code)
        .ok()
        .and_then(|i| CONDITIONS.get(i))
        .copied()
}

/// Text for a condition code as it appears in the response (a string).
pub fn translate_condition_code(code: &str) -> Option<&'static str> {
    code.trim().parse::<u32>().ok().and_then(condition_text)
}
