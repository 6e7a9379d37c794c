//! Locale symbol tables for date parsing
//!
//! Cultures are passed explicitly to `ParseDate`; nothing here reads the
//! process locale.

/// Default ordering of numeric day, month and year fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    MonthDayYear,
    DayMonthYear,
    YearMonthDay,
}

#[derive(Debug)]
pub struct Culture {
    pub name: &'static str,
    pub months: [&'static str; 12],
    pub abbreviated_months: [&'static str; 12],
    /// Sunday first
    pub days: [&'static str; 7],
    pub abbreviated_days: [&'static str; 7],
    pub am: &'static str,
    pub pm: &'static str,
    pub date_separator: &'static str,
    pub order: DateOrder,
}

const ENGLISH_MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];
const ENGLISH_ABBREVIATED_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const ENGLISH_DAYS: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];
const ENGLISH_ABBREVIATED_DAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

const PORTUGUESE_MONTHS: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto", "setembro",
    "outubro", "novembro", "dezembro",
];
const PORTUGUESE_ABBREVIATED_MONTHS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];
const PORTUGUESE_DAYS: [&str; 7] = [
    "domingo", "segunda-feira", "terça-feira", "quarta-feira", "quinta-feira", "sexta-feira",
    "sábado",
];
const PORTUGUESE_ABBREVIATED_DAYS: [&str; 7] = ["dom", "seg", "ter", "qua", "qui", "sex", "sáb"];

pub static INVARIANT: Culture = Culture {
    name: "",
    months: ENGLISH_MONTHS,
    abbreviated_months: ENGLISH_ABBREVIATED_MONTHS,
    days: ENGLISH_DAYS,
    abbreviated_days: ENGLISH_ABBREVIATED_DAYS,
    am: "AM",
    pm: "PM",
    date_separator: "/",
    order: DateOrder::MonthDayYear,
};

static CULTURES: &[Culture] = &[
    Culture {
        name: "en-US",
        months: ENGLISH_MONTHS,
        abbreviated_months: ENGLISH_ABBREVIATED_MONTHS,
        days: ENGLISH_DAYS,
        abbreviated_days: ENGLISH_ABBREVIATED_DAYS,
        am: "AM",
        pm: "PM",
        date_separator: "/",
        order: DateOrder::MonthDayYear,
    },
    Culture {
        name: "en-GB",
        months: ENGLISH_MONTHS,
        abbreviated_months: ENGLISH_ABBREVIATED_MONTHS,
        days: ENGLISH_DAYS,
        abbreviated_days: ENGLISH_ABBREVIATED_DAYS,
        am: "am",
        pm: "pm",
        date_separator: "/",
        order: DateOrder::DayMonthYear,
    },
    Culture {
        name: "fr-FR",
        months: [
            "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre",
            "octobre", "novembre", "décembre",
        ],
        abbreviated_months: [
            "janv.", "févr.", "mars", "avr.", "mai", "juin", "juil.", "août", "sept.", "oct.",
            "nov.", "déc.",
        ],
        days: ["dimanche", "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi"],
        abbreviated_days: ["dim.", "lun.", "mar.", "mer.", "jeu.", "ven.", "sam."],
        am: "",
        pm: "",
        date_separator: "/",
        order: DateOrder::DayMonthYear,
    },
    Culture {
        name: "de-DE",
        months: [
            "Januar", "Februar", "März", "April", "Mai", "Juni", "Juli", "August", "September",
            "Oktober", "November", "Dezember",
        ],
        abbreviated_months: [
            "Jan.", "Feb.", "März", "Apr.", "Mai", "Juni", "Juli", "Aug.", "Sep.", "Okt.", "Nov.",
            "Dez.",
        ],
        days: [
            "Sonntag", "Montag", "Dienstag", "Mittwoch", "Donnerstag", "Freitag", "Samstag",
        ],
        abbreviated_days: ["So.", "Mo.", "Di.", "Mi.", "Do.", "Fr.", "Sa."],
        am: "",
        pm: "",
        date_separator: ".",
        order: DateOrder::DayMonthYear,
    },
    Culture {
        name: "es-ES",
        months: [
            "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto",
            "septiembre", "octubre", "noviembre", "diciembre",
        ],
        abbreviated_months: [
            "ene.", "feb.", "mar.", "abr.", "may.", "jun.", "jul.", "ago.", "sept.", "oct.",
            "nov.", "dic.",
        ],
        days: ["domingo", "lunes", "martes", "miércoles", "jueves", "viernes", "sábado"],
        abbreviated_days: ["dom.", "lun.", "mar.", "mié.", "jue.", "vie.", "sáb."],
        am: "a. m.",
        pm: "p. m.",
        date_separator: "/",
        order: DateOrder::DayMonthYear,
    },
    Culture {
        name: "it-IT",
        months: [
            "gennaio", "febbraio", "marzo", "aprile", "maggio", "giugno", "luglio", "agosto",
            "settembre", "ottobre", "novembre", "dicembre",
        ],
        abbreviated_months: [
            "gen", "feb", "mar", "apr", "mag", "giu", "lug", "ago", "set", "ott", "nov", "dic",
        ],
        days: [
            "domenica", "lunedì", "martedì", "mercoledì", "giovedì", "venerdì", "sabato",
        ],
        abbreviated_days: ["dom", "lun", "mar", "mer", "gio", "ven", "sab"],
        am: "",
        pm: "",
        date_separator: "/",
        order: DateOrder::DayMonthYear,
    },
    Culture {
        name: "nl-NL",
        months: [
            "januari", "februari", "maart", "april", "mei", "juni", "juli", "augustus",
            "september", "oktober", "november", "december",
        ],
        abbreviated_months: [
            "jan.", "feb.", "mrt.", "apr.", "mei", "jun.", "jul.", "aug.", "sep.", "okt.",
            "nov.", "dec.",
        ],
        days: [
            "zondag", "maandag", "dinsdag", "woensdag", "donderdag", "vrijdag", "zaterdag",
        ],
        abbreviated_days: ["zo", "ma", "di", "wo", "do", "vr", "za"],
        am: "a.m.",
        pm: "p.m.",
        date_separator: "-",
        order: DateOrder::DayMonthYear,
    },
    Culture {
        name: "pt-PT",
        months: PORTUGUESE_MONTHS,
        abbreviated_months: PORTUGUESE_ABBREVIATED_MONTHS,
        days: PORTUGUESE_DAYS,
        abbreviated_days: PORTUGUESE_ABBREVIATED_DAYS,
        am: "",
        pm: "",
        date_separator: "/",
        order: DateOrder::DayMonthYear,
    },
    Culture {
        name: "pt-BR",
        months: PORTUGUESE_MONTHS,
        abbreviated_months: PORTUGUESE_ABBREVIATED_MONTHS,
        days: PORTUGUESE_DAYS,
        abbreviated_days: PORTUGUESE_ABBREVIATED_DAYS,
        am: "",
        pm: "",
        date_separator: "/",
        order: DateOrder::DayMonthYear,
    },
];

impl Culture {
    /// Resolve `fr-FR`, `FR-fr`, or a bare language such as `fr`.
    /// The empty name and `invariant` select the invariant culture.
    pub fn find(name: &str) -> Option<&'static Culture> {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("invariant") {
            return Some(&INVARIANT);
        }
        let name = name.replace('_', "-");

        CULTURES
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(&name))
            .or_else(|| {
                if name.contains('-') {
                    return None;
                }
                CULTURES.iter().find(|c| {
                    c.name
                        .split('-')
                        .next()
                        .is_some_and(|lang| lang.eq_ignore_ascii_case(&name))
                })
            })
    }

    /// 1-based month whose full or abbreviated name is `word`
    pub fn month_from_name(&self, word: &str) -> Option<u32> {
        let word = normalize_name(word);
        self.months
            .iter()
            .position(|m| normalize_name(m) == word)
            .or_else(|| {
                self.abbreviated_months
                    .iter()
                    .position(|m| normalize_name(m) == word)
            })
            .map(|index| index as u32 + 1)
    }

    pub fn is_day_name(&self, word: &str) -> bool {
        let word = normalize_name(word);
        self.days
            .iter()
            .chain(self.abbreviated_days.iter())
            .any(|d| normalize_name(d) == word)
    }

    /// `Some(true)` for PM, `Some(false)` for AM
    pub fn meridiem(&self, word: &str) -> Option<bool> {
        let word = normalize_name(word);
        let matches = |designator: &str| {
            !designator.is_empty() && normalize_name(designator) == word
        };
        if matches(self.pm) || word == "pm" {
            Some(true)
        } else if matches(self.am) || word == "am" {
            Some(false)
        } else {
            None
        }
    }
}

/// Lowercased, without a trailing abbreviation dot
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_cultures() {
        assert_eq!(Culture::find("fr-FR").unwrap().name, "fr-FR");
        assert_eq!(Culture::find("FR-fr").unwrap().name, "fr-FR");
        assert_eq!(Culture::find("de").unwrap().name, "de-DE");
        assert_eq!(Culture::find("pt_BR").unwrap().name, "pt-BR");
        assert_eq!(Culture::find("").unwrap().name, "");
        assert!(Culture::find("xx-YY").is_none());
        assert!(Culture::find("fr-CA").is_none());
    }

    #[test]
    fn test_month_names() {
        let fr = Culture::find("fr-FR").unwrap();
        assert_eq!(fr.month_from_name("juin"), Some(6));
        assert_eq!(fr.month_from_name("Décembre"), Some(12));
        assert_eq!(fr.month_from_name("févr."), Some(2));
        assert_eq!(fr.month_from_name("févr"), Some(2));
        assert_eq!(fr.month_from_name("June"), None);

        assert_eq!(INVARIANT.month_from_name("sep"), Some(9));
        assert_eq!(INVARIANT.month_from_name("SEPTEMBER"), Some(9));
    }

    #[test]
    fn test_day_names_and_meridiem() {
        let de = Culture::find("de-DE").unwrap();
        assert!(de.is_day_name("Mittwoch"));
        assert!(de.is_day_name("mi."));
        assert!(!de.is_day_name("März"));

        assert_eq!(INVARIANT.meridiem("PM"), Some(true));
        assert_eq!(INVARIANT.meridiem("am"), Some(false));
        assert_eq!(INVARIANT.meridiem("noon"), None);
    }
}
