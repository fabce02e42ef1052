//! Localization capability used by the presenter and the status line.
//!
//! The core only ever asks for `key -> string`; [`Catalog`] is the built-in
//! English/Spanish table the terminal host uses.

use std::fmt::Debug;

/// Status labels shown instead of a weather reading.
pub const FETCHING_WEATHER: &str = "fetchingWeather";
pub const SET_LOCATION_TO_SEE_WEATHER: &str = "setLocationToSeeWeather";
pub const WEATHER_OFF: &str = "weatherOff";
pub const WEATHER_UNAVAILABLE: &str = "weatherUnavailable";
pub const PROFILE_LABEL: &str = "profileLabel";

/// Anything that can turn a message key into user-facing text.
pub trait Translate: Send + Sync + Debug {
    fn translate(&self, key: &str) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Spanish,
}

impl Language {
    /// Pick a language from a locale tag such as `es_AR.UTF-8` or `en-US`.
    /// Only Spanish is recognised; everything else is English.
    pub fn from_locale(locale: &str) -> Self {
        if locale.trim().to_lowercase().starts_with("es") {
            Language::Spanish
        } else {
            Language::English
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
        }
    }

    pub const fn all() -> &'static [Language] {
        &[Language::English, Language::Spanish]
    }

    fn table(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Language::English => EN,
            Language::Spanish => ES,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Language::English => "English",
            Language::Spanish => "Español",
        })
    }
}

/// Built-in string table. Lookup falls back to English, then to the key itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog {
    language: Language,
}

impl Catalog {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

impl Translate for Catalog {
    fn translate(&self, key: &str) -> String {
        lookup(self.language.table(), key)
            .or_else(|| lookup(EN, key))
            .unwrap_or(key)
            .to_string()
    }
}

const EN: &[(&str, &str)] = &[
    ("fetchingWeather", "Fetching weather…"),
    ("setLocationToSeeWeather", "Set your location in Settings to see the weather."),
    ("weatherOff", "Weather took the day off."),
    ("weatherUnavailable", "Weather unavailable. Maybe it's shy."),
    ("goodMorning", "Good morning"),
    ("goodAfternoon", "Good afternoon"),
    ("goodEvening", "Good evening"),
    ("profileLabel", "Profile"),
    ("clearSky", "Clear sky ☀️. Perfect day to go out."),
    ("mostlyClear", "Mostly clear 🌤️. A few clouds around."),
    ("partlyCloudy", "Partly cloudy ⛅. Sun may pop out later."),
    ("overcast", "Overcast ☁️. A bit gray, but calm."),
    ("fog", "Fog 🌫️. Drive carefully."),
    ("lightDrizzle", "Light drizzle 🌦️. Bring an umbrella just in case ☂️."),
    ("moderateDrizzle", "Moderate drizzle 🌧️. Keep an umbrella handy ☔."),
    ("heavyDrizzle", "Heavy drizzle 🌧️. Cozy coffee weather ☕."),
    ("freezingDrizzle", "Freezing drizzle ❄️. Watch for slippery surfaces."),
    ("lightRain", "Light rain 🌦️. An umbrella might help ☂️."),
    ("moderateRain", "Moderate rain 🌧️. Stay dry out there."),
    ("heavyRain", "Heavy rain ⛈️. Best to avoid going out."),
    ("freezingRain", "Freezing rain ❄️. Bundle up and walk carefully."),
    ("lightSnow", "Light snow 🌨️. Looks pretty outside."),
    ("moderateSnow", "Moderate snow ❄️. Dress warm."),
    ("heavySnow", "Heavy snow 🌨️❄️. Better stay indoors."),
    ("snowGrains", "Snow grains falling 🌨️."),
    ("lightShowers", "Light showers 🌦️. Might rain a bit."),
    ("moderateShowers", "Moderate showers 🌧️. Umbrella could help ☂️."),
    ("heavyShowers", "Heavy showers ⛈️. Umbrella or hood recommended."),
    ("snowShowers", "Snow showers 🌨️. Might accumulate on the ground."),
    ("heavySnowShowers", "Heavy snow showers ❄️. Use caution."),
    ("thunderstorm", "Thunderstorm ⚡. Stay indoors if you can."),
    ("hailstorm", "Hailstorm ⛈️. Best to stay inside."),
    ("unidentifiedWeather", "Weather not identified 🤔."),
    ("windyAdvisory", "Quite windy 💨."),
    ("heatAdvisory", "It's hot 🥵, stay hydrated."),
    ("coldAdvisory", "It's cold 🧣, dress warm."),
];

const ES: &[(&str, &str)] = &[
    ("fetchingWeather", "Obteniendo clima…"),
    ("setLocationToSeeWeather", "Configura tu ubicación en Ajustes para ver el clima."),
    ("weatherOff", "El clima se tomó el día libre."),
    ("weatherUnavailable", "Clima no disponible. Quizás está tímido."),
    ("goodMorning", "Buenos días"),
    ("goodAfternoon", "Buenas tardes"),
    ("goodEvening", "Buenas noches"),
    ("profileLabel", "Perfil"),
    ("clearSky", "Cielo despejado ☀️. Día ideal para salir."),
    ("mostlyClear", "Mayormente despejado 🌤️. Unas pocas nubes aquí y allá."),
    ("partlyCloudy", "Parcialmente nublado ⛅. Tal vez salga el sol luego."),
    ("overcast", "Cielo nublado ☁️. Día algo gris, pero tranquilo."),
    ("fog", "Niebla 🌫️. Maneja con precaución."),
    ("lightDrizzle", "Llovizna ligera 🌦️. Lleva paraguas por si acaso ☂️."),
    ("moderateDrizzle", "Llovizna moderada 🌧️. Mejor tener paraguas a mano ☔."),
    ("heavyDrizzle", "Llovizna intensa 🌧️. Ideal para quedarse en casa con café ☕."),
    ("freezingDrizzle", "Llovizna helada ❄️. Cuidado con superficies resbaladizas."),
    ("lightRain", "Lluvia ligera 🌦️. Un paraguas podría ser buena idea ☂️."),
    ("moderateRain", "Lluvia moderada 🌧️. Evita mojarte sin abrigo."),
    ("heavyRain", "Lluvia intensa ⛈️. Mejor evitar salir sin necesidad."),
    ("freezingRain", "Lluvia helada ❄️. Abrígate y camina con cuidado."),
    ("lightSnow", "Nieve ligera 🌨️. Puede verse bonito afuera."),
    ("moderateSnow", "Nieve moderada ❄️. Abrígate bien."),
    ("heavySnow", "Nieve intensa 🌨️❄️. Mejor permanecer en interiores."),
    ("snowGrains", "Caen granitos de nieve 🌨️."),
    ("lightShowers", "Chubascos débiles 🌦️. Tal vez llueva un poco."),
    ("moderateShowers", "Chubascos moderados 🌧️. Lleva paraguas por si acaso ☂️."),
    ("heavyShowers", "Chubascos fuertes ⛈️. Mejor tener paraguas o capucha."),
    ("snowShowers", "Chubascos de nieve 🌨️. Puede acumularse en el suelo."),
    ("heavySnowShowers", "Chubascos de nieve intensos ❄️. Precaución al salir."),
    ("thunderstorm", "Tormenta eléctrica ⚡. Quédate bajo techo si puedes."),
    ("hailstorm", "Tormenta con granizo ⛈️. Evita salir por seguridad."),
    ("unidentifiedWeather", "Clima no identificado 🤔."),
    ("windyAdvisory", "Hace bastante viento 💨."),
    ("heatAdvisory", "Hace calor 🥵, hidrátate bien."),
    ("coldAdvisory", "Hace frío 🧣, abrígate bien."),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_detection_only_matches_spanish_prefix() {
        assert_eq!(Language::from_locale("es_AR.UTF-8"), Language::Spanish);
        assert_eq!(Language::from_locale("ES-es"), Language::Spanish);
        assert_eq!(Language::from_locale("en_US.UTF-8"), Language::English);
        assert_eq!(Language::from_locale(""), Language::English);
        assert_eq!(Language::from_locale("fr"), Language::English);
    }

    #[test]
    fn translate_uses_active_language() {
        let es = Catalog::new(Language::Spanish);
        assert_eq!(es.translate(WEATHER_OFF), "El clima se tomó el día libre.");

        let en = Catalog::default();
        assert_eq!(en.translate(WEATHER_OFF), "Weather took the day off.");
    }

    #[test]
    fn unknown_key_falls_back_to_key() {
        let es = Catalog::new(Language::Spanish);
        assert_eq!(es.translate("noSuchKey"), "noSuchKey");
    }

    #[test]
    fn spanish_table_covers_every_english_key() {
        for (key, _) in EN {
            assert!(lookup(ES, key).is_some(), "missing spanish text for {key}");
        }
    }

    #[test]
    fn every_language_roundtrips_through_its_tag() {
        for lang in Language::all() {
            assert_eq!(Language::from_locale(lang.as_str()), *lang, "{lang}");
        }
    }
}
