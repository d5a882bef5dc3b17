//! Cálculo de períodos de reporte
//!
//! Este módulo contiene el álgebra de calendario pura del sistema:
//! límites e identificadores canónicos para las 4 granularidades,
//! parseo estricto de identificadores, períodos adyacentes y etiquetas
//! legibles en español.
//!
//! Formatos canónicos de id (el zero-padding es obligatorio para que
//! los ids ordenen lexicográficamente en orden cronológico):
//! - daily    `YYYY-MM-DD`
//! - weekly   `{isoWeekYear}-W{isoWeek:02}`
//! - biweekly `{isoWeekYear}-BW{biWeek:02}`
//! - monthly  `YYYY-MM`

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

use crate::models::period::{PeriodRange, PeriodType};

lazy_static! {
    static ref RE_DAILY: Regex = Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap();
    static ref RE_WEEKLY: Regex = Regex::new(r"^(\d{4})-W(\d{2})$").unwrap();
    static ref RE_BIWEEKLY: Regex = Regex::new(r"^(\d{4})-BW(\d{2})$").unwrap();
    static ref RE_MONTHLY: Regex = Regex::new(r"^(\d{4})-(\d{2})$").unwrap();
}

const MESES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

const MESES_CORTOS: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sep", "oct", "nov", "dic",
];

/// Jueves de la semana ISO (lunes-domingo) que contiene la fecha
fn thursday_of_week(date: NaiveDate) -> NaiveDate {
    let desde_lunes = date.weekday().num_days_from_monday() as i64;
    date + Duration::days(3 - desde_lunes)
}

/// Número de semana ISO-8601 por la regla del jueves: se desplaza la
/// fecha al jueves de su semana y `week = ceil((díasDesdeInicioDeAño+1)/7)`
pub fn iso_week_number(date: NaiveDate) -> u32 {
    let thursday = thursday_of_week(date);
    let jan1 = NaiveDate::from_ymd_opt(thursday.year(), 1, 1)
        .expect("January 1st always exists");
    let dias = (thursday - jan1).num_days();
    (dias / 7 + 1) as u32
}

/// Año de la semana ISO - puede diferir del año calendario cerca del
/// 29 de diciembre al 4 de enero
pub fn iso_week_year(date: NaiveDate) -> i32 {
    thursday_of_week(date).year()
}

/// Número de bi-semana: `ceil(isoWeek/2)` (semanas 1-2 -> 1, 3-4 -> 2, ...)
///
/// No se re-ancla en el cambio de año; una bi-semana que cruza el
/// límite conserva la numeración del año ISO de su semana inicial.
pub fn biweek_number(date: NaiveDate) -> u32 {
    (iso_week_number(date) + 1) / 2
}

/// Lunes de la semana ISO que contiene la fecha
fn monday_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Lunes de la semana ISO (year, week). El 4 de enero siempre cae en
/// la semana 1 del año ISO.
fn monday_of_iso_week(iso_year: i32, week: u32) -> NaiveDate {
    let jan4 = NaiveDate::from_ymd_opt(iso_year, 1, 4).expect("January 4th always exists");
    monday_of_week(jan4) + Duration::weeks(week as i64 - 1)
}

/// Cantidad de semanas del año ISO (52 o 53). El 28 de diciembre cae
/// siempre en la última semana.
fn weeks_in_iso_year(iso_year: i32) -> u32 {
    let dec28 = NaiveDate::from_ymd_opt(iso_year, 12, 28).expect("December 28th always exists");
    iso_week_number(dec28)
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_milli_opt(0, 0, 0, 0).expect("midnight always exists")
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .expect("end of day always exists")
}

/// Identificador canónico del período que contiene la fecha
pub fn format_period_id(period_type: PeriodType, date: NaiveDate) -> String {
    match period_type {
        PeriodType::Daily => date.format("%Y-%m-%d").to_string(),
        PeriodType::Weekly => {
            format!("{}-W{:02}", iso_week_year(date), iso_week_number(date))
        }
        PeriodType::Biweekly => {
            format!("{}-BW{:02}", iso_week_year(date), biweek_number(date))
        }
        PeriodType::Monthly => date.format("%Y-%m").to_string(),
    }
}

/// Parsear un identificador de período a su fecha ancla (inicio)
///
/// Match estricto por regex según formato. `None` es el resultado
/// normal "not found" para ids malformados o fuera de rango, no una
/// falla interna.
pub fn parse_period_id(id: &str, period_type: PeriodType) -> Option<NaiveDate> {
    match period_type {
        PeriodType::Daily => {
            let caps = RE_DAILY.captures(id)?;
            let year: i32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            let day: u32 = caps[3].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        }
        PeriodType::Weekly => {
            let caps = RE_WEEKLY.captures(id)?;
            let year: i32 = caps[1].parse().ok()?;
            let week: u32 = caps[2].parse().ok()?;
            if week < 1 || week > weeks_in_iso_year(year) {
                return None;
            }
            Some(monday_of_iso_week(year, week))
        }
        PeriodType::Biweekly => {
            let caps = RE_BIWEEKLY.captures(id)?;
            let year: i32 = caps[1].parse().ok()?;
            let biweek: u32 = caps[2].parse().ok()?;
            if biweek < 1 || biweek > (weeks_in_iso_year(year) + 1) / 2 {
                return None;
            }
            // La bi-semana bb parte en la semana ISO impar 2*bb-1
            Some(monday_of_iso_week(year, biweek * 2 - 1))
        }
        PeriodType::Monthly => {
            let caps = RE_MONTHLY.captures(id)?;
            let year: i32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, 1)
        }
    }
}

/// Rango completo del período que contiene la fecha de referencia
pub fn get_period_range(period_type: PeriodType, reference: NaiveDate) -> PeriodRange {
    let (start_date, end_date) = match period_type {
        PeriodType::Daily => (reference, reference),
        PeriodType::Weekly => {
            let monday = monday_of_week(reference);
            (monday, monday + Duration::days(6))
        }
        PeriodType::Biweekly => {
            // La bi-semana parte en la semana ISO impar; si la referencia
            // cae en semana par, el inicio es el lunes anterior
            let monday = monday_of_week(reference);
            let start = if iso_week_number(reference) % 2 == 0 {
                monday - Duration::days(7)
            } else {
                monday
            };
            (start, start + Duration::days(13))
        }
        PeriodType::Monthly => {
            let first = reference.with_day(1).expect("day 1 always exists");
            let next_month = first
                .checked_add_months(Months::new(1))
                .expect("month arithmetic overflow");
            (first, next_month - Duration::days(1))
        }
    };

    PeriodRange {
        period_type,
        id: format_period_id(period_type, start_date),
        start: start_of_day(start_date),
        end: end_of_day(end_date),
        display_label: format_period_display(period_type, start_date, end_date),
    }
}

/// Reconstruir el rango completo desde un identificador canónico
pub fn get_period_range_from_id(id: &str, period_type: PeriodType) -> Option<PeriodRange> {
    let anchor = parse_period_id(id, period_type)?;
    Some(get_period_range(period_type, anchor))
}

/// Período inmediatamente anterior al que contiene la referencia
///
/// Desplaza la referencia exactamente un largo de período y recalcula
/// el rango completo - nunca por resta ingenua de límites, para que
/// los meses de largo variable y la alineación semanal queden bien.
pub fn get_previous_period(period_type: PeriodType, reference: NaiveDate) -> PeriodRange {
    let shifted = match period_type {
        PeriodType::Daily => reference - Duration::days(1),
        PeriodType::Weekly => reference - Duration::days(7),
        PeriodType::Biweekly => reference - Duration::days(14),
        PeriodType::Monthly => reference
            .checked_sub_months(Months::new(1))
            .expect("month arithmetic overflow"),
    };
    get_period_range(period_type, shifted)
}

/// Período inmediatamente posterior al que contiene la referencia
pub fn get_next_period(period_type: PeriodType, reference: NaiveDate) -> PeriodRange {
    let shifted = match period_type {
        PeriodType::Daily => reference + Duration::days(1),
        PeriodType::Weekly => reference + Duration::days(7),
        PeriodType::Biweekly => reference + Duration::days(14),
        PeriodType::Monthly => reference
            .checked_add_months(Months::new(1))
            .expect("month arithmetic overflow"),
    };
    get_period_range(period_type, shifted)
}

fn capitalizar(palabra: &str) -> String {
    let mut chars = palabra.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Etiqueta legible del período en español
///
/// - daily:   "5 de enero de 2026"
/// - weekly/biweekly: "5-11 ene 2026" (mismo mes),
///   "26 ene - 1 feb 2026" (mismo año), "29 dic 2025 - 4 ene 2026"
/// - monthly: "Enero 2026"
pub fn format_period_display(
    period_type: PeriodType,
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    match period_type {
        PeriodType::Daily => format!(
            "{} de {} de {}",
            start.day(),
            MESES[start.month0() as usize],
            start.year()
        ),
        PeriodType::Weekly | PeriodType::Biweekly => {
            if start.month() == end.month() && start.year() == end.year() {
                format!(
                    "{}-{} {} {}",
                    start.day(),
                    end.day(),
                    MESES_CORTOS[start.month0() as usize],
                    start.year()
                )
            } else if start.year() == end.year() {
                format!(
                    "{} {} - {} {} {}",
                    start.day(),
                    MESES_CORTOS[start.month0() as usize],
                    end.day(),
                    MESES_CORTOS[end.month0() as usize],
                    start.year()
                )
            } else {
                format!(
                    "{} {} {} - {} {} {}",
                    start.day(),
                    MESES_CORTOS[start.month0() as usize],
                    start.year(),
                    end.day(),
                    MESES_CORTOS[end.month0() as usize],
                    end.year()
                )
            }
        }
        PeriodType::Monthly => format!(
            "{} {}",
            capitalizar(MESES[start.month0() as usize]),
            start.year()
        ),
    }
}
