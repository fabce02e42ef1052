//! Turns raw current conditions into the icon, temperature text and
//! localized message shown on the status line.

use crate::{i18n::Translate, model::Units};

/// Wind advisory threshold in km/h (the request always asks for km/h).
pub const WINDY_KMH: f64 = 35.0;

/// Weather condition keyed by the provider's WMO code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    ClearSky,
    MostlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    LightDrizzle,
    ModerateDrizzle,
    HeavyDrizzle,
    FreezingDrizzle,
    LightRain,
    ModerateRain,
    HeavyRain,
    FreezingRain,
    LightSnow,
    ModerateSnow,
    HeavySnow,
    SnowGrains,
    LightShowers,
    ModerateShowers,
    HeavyShowers,
    SnowShowers,
    HeavySnowShowers,
    Thunderstorm,
    Hailstorm,
    Unidentified,
}

impl Condition {
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::ClearSky,
            1 => Self::MostlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 | 48 => Self::Fog,
            51 => Self::LightDrizzle,
            53 => Self::ModerateDrizzle,
            55 => Self::HeavyDrizzle,
            56 | 57 => Self::FreezingDrizzle,
            61 => Self::LightRain,
            63 => Self::ModerateRain,
            65 => Self::HeavyRain,
            66 | 67 => Self::FreezingRain,
            71 => Self::LightSnow,
            73 => Self::ModerateSnow,
            75 => Self::HeavySnow,
            77 => Self::SnowGrains,
            80 => Self::LightShowers,
            81 => Self::ModerateShowers,
            82 => Self::HeavyShowers,
            85 => Self::SnowShowers,
            86 => Self::HeavySnowShowers,
            95 => Self::Thunderstorm,
            96 | 99 => Self::Hailstorm,
            _ => Self::Unidentified,
        }
    }

    /// Translation key of the base message.
    pub const fn message_key(&self) -> &'static str {
        match self {
            Self::ClearSky => "clearSky",
            Self::MostlyClear => "mostlyClear",
            Self::PartlyCloudy => "partlyCloudy",
            Self::Overcast => "overcast",
            Self::Fog => "fog",
            Self::LightDrizzle => "lightDrizzle",
            Self::ModerateDrizzle => "moderateDrizzle",
            Self::HeavyDrizzle => "heavyDrizzle",
            Self::FreezingDrizzle => "freezingDrizzle",
            Self::LightRain => "lightRain",
            Self::ModerateRain => "moderateRain",
            Self::HeavyRain => "heavyRain",
            Self::FreezingRain => "freezingRain",
            Self::LightSnow => "lightSnow",
            Self::ModerateSnow => "moderateSnow",
            Self::HeavySnow => "heavySnow",
            Self::SnowGrains => "snowGrains",
            Self::LightShowers => "lightShowers",
            Self::ModerateShowers => "moderateShowers",
            Self::HeavyShowers => "heavyShowers",
            Self::SnowShowers => "snowShowers",
            Self::HeavySnowShowers => "heavySnowShowers",
            Self::Thunderstorm => "thunderstorm",
            Self::Hailstorm => "hailstorm",
            Self::Unidentified => "unidentifiedWeather",
        }
    }
}

/// Extra clause appended after the base message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    Windy,
    Hot,
    Cold,
}

impl Advisory {
    pub const fn message_key(&self) -> &'static str {
        match self {
            Self::Windy => "windyAdvisory",
            Self::Hot => "heatAdvisory",
            Self::Cold => "coldAdvisory",
        }
    }
}

/// Advisories in display order: wind first, then at most one of heat/cold.
pub fn advisories(temperature: f64, wind_speed: f64, units: Units) -> Vec<Advisory> {
    let mut out = Vec::with_capacity(2);

    if wind_speed >= WINDY_KMH {
        out.push(Advisory::Windy);
    }

    let (hot_at, cold_at) = match units {
        Units::Celsius => (30.0, 0.0),
        Units::Fahrenheit => (86.0, 32.0),
    };
    if temperature >= hot_at {
        out.push(Advisory::Hot);
    } else if temperature <= cold_at {
        out.push(Advisory::Cold);
    }

    out
}

/// Status-line glyph. Coarser than [`Condition`]; seven buckets plus a globe.
pub fn icon(code: i32) -> &'static str {
    match code {
        0 => "☀️",
        1..=3 => "⛅",
        45 | 48 => "🌫️",
        51 | 53 | 55 | 56 | 57 => "🌦️",
        61 | 63 | 65 | 66 | 67 | 80 | 81 | 82 => "🌧️",
        71 | 73 | 75 | 77 | 85 | 86 => "❄️",
        95 | 96 | 99 => "⛈️",
        _ => "🌍",
    }
}

/// Round to the nearest whole degree (halves go up) and append the unit glyph.
pub fn format_temperature(temperature: f64, units: Units) -> String {
    let rounded = (temperature + 0.5).floor() as i64;
    format!("{rounded}{}", units.symbol())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub icon: &'static str,
    pub message: String,
}

pub fn describe(
    code: i32,
    temperature: f64,
    wind_speed: f64,
    units: Units,
    tr: &dyn Translate,
) -> Description {
    let base = tr.translate(Condition::from_code(code).message_key());

    let message = std::iter::once(base)
        .chain(
            advisories(temperature, wind_speed, units)
                .iter()
                .map(|a| tr.translate(a.message_key())),
        )
        .collect::<Vec<_>>()
        .join(" ");

    Description {
        icon: icon(code),
        message,
    }
}
