//! Display formatting for condition text and readings.

/// Glyph for a free-text condition, matched by keyword in the same priority
/// order as the theme (there is no wind glyph).
pub fn condition_emoji(condition: &str) -> &'static str {
    let c = condition.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| c.contains(w));

    if has(&["thunder", "storm"]) {
        "⛈️"
    } else if has(&["rain", "shower", "drizzle"]) {
        "🌧️"
    } else if has(&["snow", "sleet", "blizzard"]) {
        "❄️"
    } else if has(&["fog", "mist", "haze"]) {
        "🌫️"
    } else if has(&["cloud"]) {
        "☁️"
    } else if has(&["clear", "sun"]) {
        "🌤️"
    } else if has(&["night"]) {
        "🌙"
    } else {
        "🌈"
    }
}

/// Glyph for an exact WeatherAPI condition label
pub fn condition_icon(condition: &str) -> &'static str {
    match condition {
        "Sunny" => "☀️",
        "Clear" => "🌙",
        "Partly cloudy" => "⛅️",
        "Cloudy" => "☁️",
        "Overcast" => "🌥️",
        "Mist" | "Fog" => "🌫️",
        "Patchy rain possible" | "Patchy light rain" | "Light rain shower" => "🌦️",
        "Patchy snow possible"
        | "Patchy sleet possible"
        | "Light sleet"
        | "Moderate or heavy sleet"
        | "Patchy light snow"
        | "Light snow"
        | "Patchy moderate snow"
        | "Moderate snow"
        | "Patchy heavy snow"
        | "Heavy snow"
        | "Light sleet showers"
        | "Moderate or heavy sleet showers"
        | "Light snow showers"
        | "Moderate or heavy snow showers" => "🌨️",
        "Patchy freezing drizzle possible"
        | "Freezing fog"
        | "Freezing drizzle"
        | "Heavy freezing drizzle"
        | "Light freezing rain"
        | "Moderate or heavy freezing rain"
        | "Ice pellets"
        | "Light showers of ice pellets"
        | "Moderate or heavy showers of ice pellets" => "🥶",
        "Thundery outbreaks possible"
        | "Patchy light rain with thunder"
        | "Moderate or heavy rain with thunder"
        | "Patchy light snow with thunder"
        | "Moderate or heavy snow with thunder" => "⛈️",
        "Blowing snow" => "🌬️",
        "Blizzard" => "❄️",
        "Patchy light drizzle" | "Light drizzle" => "💧",
        "Light rain"
        | "Moderate rain at times"
        | "Moderate rain"
        | "Heavy rain at times"
        | "Heavy rain"
        | "Moderate or heavy rain shower"
        | "Torrential rain shower" => "🌧️",
        _ => "🤔",
    }
}

/// Whole-degree Celsius reading, e.g. `12°C`
pub fn format_temperature(celsius: f64) -> String {
    format!("{}°C", celsius.round() as i64)
}

pub fn format_wind(kph: f64) -> String {
    format!("{} km/h", kph.round() as i64)
}

pub fn format_humidity(percent: f64) -> String {
    format!("{}%", percent.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emoji_priority() {
        assert_eq!(condition_emoji("Moderate or heavy rain with thunder"), "⛈️");
        assert_eq!(condition_emoji("Light drizzle"), "🌧️");
        assert_eq!(condition_emoji("Windy"), "🌈");
        assert_eq!(condition_emoji("CLEAR"), "🌤️");
    }

    #[test]
    fn test_icon_exact_match_only() {
        assert_eq!(condition_icon("Sunny"), "☀️");
        assert_eq!(condition_icon("Clear"), "🌙");
        assert_eq!(condition_icon("Torrential rain shower"), "🌧️");
        assert_eq!(condition_icon("sunny"), "🤔");
    }

    #[test]
    fn test_readings() {
        assert_eq!(format_temperature(11.6), "12°C");
        assert_eq!(format_temperature(-0.4), "0°C");
        assert_eq!(format_wind(14.4), "14 km/h");
        assert_eq!(format_humidity(72.0), "72%");
    }
}
