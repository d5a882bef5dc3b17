//! Agregación de métricas del período
//!
//! Este módulo es una función pura: recibe las listas de registros en
//! memoria (período actual, período anterior y finanzas por vehículo)
//! y produce las métricas tipadas. Sin I/O, sin estado.
//!
//! Convención de redondeo: dinero nunca se redondea; tasas y ratios a
//! 1 decimal; revenue/costo por km al entero más cercano. Toda división
//! con denominador 0 produce 0 (o None para los deltas vs período
//! anterior), nunca NaN ni infinito.

use std::collections::HashMap;

use crate::models::metrics::{
    CancellationsByReason, CancellationsMetrics, ExpenseCategorySummary, KilometersMetrics,
    PeriodMetrics, RidesBySource, RidesMetrics, SourceBreakdown, VehicleFinanceMetrics,
};
use crate::models::ride::{RideRecord, RideSource};
use crate::models::vehicle::VehicleFinanceRecord;

/// Redondear a 1 decimal (tasas y ratios)
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Tabla de alias de motivos de cancelación: se aceptan la forma corta
/// y la larga de cada responsable; cualquier otro texto cae en `other`.
fn reason_bucket(reason: Option<&str>) -> &'static str {
    match reason.map(|r| r.trim().to_lowercase()).as_deref() {
        Some("by_passenger") | Some("passenger") => "passenger",
        Some("by_driver") | Some("driver") => "driver",
        _ => "other",
    }
}

/// Métricas de viajes del período actual, con delta vs el anterior
pub fn aggregate_rides(current: &[RideRecord], previous: &[RideRecord]) -> RidesMetrics {
    let completed: Vec<&RideRecord> = current.iter().filter(|r| r.is_completed()).collect();
    let completed_count = completed.len() as i64;
    let total_revenue: f64 = completed.iter().map(|r| r.fare_received).sum();

    let average_per_ride = if completed_count > 0 {
        total_revenue / completed_count as f64
    } else {
        0.0
    };

    let source_breakdown = |source: RideSource| -> SourceBreakdown {
        let of_source: Vec<&&RideRecord> =
            completed.iter().filter(|r| r.source == source).collect();
        let count = of_source.len() as i64;
        SourceBreakdown {
            count,
            revenue: of_source.iter().map(|r| r.fare_received).sum(),
            percentage: if completed_count > 0 {
                round1(count as f64 / completed_count as f64 * 100.0)
            } else {
                0.0
            },
        }
    };

    let prev_completed = previous.iter().filter(|r| r.is_completed()).count() as i64;
    let change_vs_previous = if prev_completed > 0 {
        Some(round1(
            (completed_count - prev_completed) as f64 / prev_completed as f64 * 100.0,
        ))
    } else {
        None
    };

    RidesMetrics {
        total: current.len() as i64,
        completed: completed_count,
        total_revenue,
        average_per_ride,
        by_source: RidesBySource {
            platform: source_breakdown(RideSource::Platform),
            external: source_breakdown(RideSource::External),
        },
        change_vs_previous,
    }
}

/// Tasa de cancelación de un conjunto de viajes, 1 decimal.
/// 0 cuando no hay viajes terminados.
fn cancellation_rate(rides: &[RideRecord]) -> Option<f64> {
    let completed = rides.iter().filter(|r| r.is_completed()).count();
    let cancelled = rides.iter().filter(|r| r.is_cancelled()).count();
    let total = completed + cancelled;
    if total == 0 {
        None
    } else {
        Some(round1(cancelled as f64 / total as f64 * 100.0))
    }
}

/// Métricas de cancelaciones con delta absoluto en puntos porcentuales
pub fn aggregate_cancellations(
    current: &[RideRecord],
    previous: &[RideRecord],
) -> CancellationsMetrics {
    let cancelled: Vec<&RideRecord> = current.iter().filter(|r| r.is_cancelled()).collect();

    let mut by_reason = CancellationsByReason {
        by_passenger: 0,
        by_driver: 0,
        other: 0,
    };
    for ride in &cancelled {
        match reason_bucket(ride.cancellation_reason.as_deref()) {
            "passenger" => by_reason.by_passenger += 1,
            "driver" => by_reason.by_driver += 1,
            _ => by_reason.other += 1,
        }
    }

    let rate = cancellation_rate(current).unwrap_or(0.0);
    let change_vs_previous = cancellation_rate(previous).map(|prev| round1(rate - prev));

    CancellationsMetrics {
        total: cancelled.len() as i64,
        rate,
        by_reason,
        change_vs_previous,
    }
}

/// Métricas de distancia sobre los viajes completados del período
pub fn aggregate_kilometers(current: &[RideRecord]) -> KilometersMetrics {
    let completed: Vec<&RideRecord> = current.iter().filter(|r| r.is_completed()).collect();
    let total_km: f64 = completed.iter().map(|r| r.distance_km()).sum();
    let total_revenue: f64 = completed.iter().map(|r| r.fare_received).sum();

    KilometersMetrics {
        total_km,
        average_per_ride: if completed.is_empty() {
            0.0
        } else {
            round1(total_km / completed.len() as f64)
        },
        revenue_per_km: if total_km > 0.0 {
            (total_revenue / total_km).round()
        } else {
            0.0
        },
    }
}

/// P/L por vehículo, acotado a los viajes completados asignados a cada uno
///
/// La lista final queda ordenada por total_income descendente. El orden
/// de `finances` (que puede venir de lecturas concurrentes) no afecta
/// el resultado.
pub fn aggregate_vehicle_finances(
    current: &[RideRecord],
    finances: &[VehicleFinanceRecord],
) -> Vec<VehicleFinanceMetrics> {
    let mut result: Vec<VehicleFinanceMetrics> = finances
        .iter()
        .map(|record| {
            let assigned: Vec<&RideRecord> = current
                .iter()
                .filter(|r| r.is_completed() && r.vehicle_id == Some(record.vehicle.id))
                .collect();

            let total_km: f64 = assigned.iter().map(|r| r.distance_km()).sum();
            let fares: f64 = assigned.iter().map(|r| r.fare_received).sum();
            let recorded_income: f64 = record.income.iter().map(|e| e.amount).sum();
            let total_income = fares + recorded_income;
            let total_expenses: f64 = record.expenses.iter().map(|e| e.amount).sum();

            VehicleFinanceMetrics {
                vehicle_id: record.vehicle.id,
                vehicle_name: record.vehicle.display_name(),
                rides_count: assigned.len() as i64,
                total_km,
                total_income,
                total_expenses,
                net_profit: total_income - total_expenses,
                cost_per_km: if total_km > 0.0 {
                    (total_expenses / total_km).round()
                } else {
                    0.0
                },
                top_expense_categories: top_expense_categories(record),
            }
        })
        .collect();

    // sort_by es estable: empates conservan el orden de entrada
    result.sort_by(|a, b| {
        b.total_income
            .partial_cmp(&a.total_income)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    result
}

/// Top-3 categorías de gasto por monto acumulado, descendente.
/// Estable en empates: se preserva el orden de primera aparición.
fn top_expense_categories(record: &VehicleFinanceRecord) -> Vec<ExpenseCategorySummary> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, f64> = HashMap::new();
    for expense in &record.expenses {
        if !totals.contains_key(&expense.category) {
            order.push(expense.category.clone());
        }
        *totals.entry(expense.category.clone()).or_insert(0.0) += expense.amount;
    }

    let mut categories: Vec<ExpenseCategorySummary> = order
        .into_iter()
        .map(|category| {
            let amount = totals[&category];
            ExpenseCategorySummary { category, amount }
        })
        .collect();
    categories.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    categories.truncate(3);
    categories
}

/// Conjunto completo de métricas del período
pub fn aggregate_period_metrics(
    current: &[RideRecord],
    previous: &[RideRecord],
    finances: &[VehicleFinanceRecord],
) -> PeriodMetrics {
    PeriodMetrics {
        rides: aggregate_rides(current, previous),
        cancellations: aggregate_cancellations(current, previous),
        kilometers: aggregate_kilometers(current),
        vehicles: aggregate_vehicle_finances(current, finances),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ride::{DistanceUnit, RideStatus};
    use crate::models::vehicle::{ExpenseEntry, IncomeEntry, VehicleInfo};
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn ride(
        status: RideStatus,
        fare: f64,
        source: RideSource,
        km: f64,
        vehicle_id: Option<Uuid>,
    ) -> RideRecord {
        RideRecord {
            driver_id: Uuid::new_v4(),
            vehicle_id,
            ride_at: Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap(),
            status,
            cancellation_reason: None,
            source,
            fare_received: fare,
            commission: fare * 0.2,
            total_paid: fare,
            distance_value: km,
            distance_unit: DistanceUnit::Km,
        }
    }

    fn cancelled_with_reason(reason: Option<&str>) -> RideRecord {
        let mut r = ride(RideStatus::Cancelled, 0.0, RideSource::Platform, 0.0, None);
        r.cancellation_reason = reason.map(|s| s.to_string());
        r
    }

    #[test]
    fn test_rides_vacios_no_producen_nan() {
        let metrics = aggregate_rides(&[], &[]);
        assert_eq!(metrics.total, 0);
        assert_eq!(metrics.average_per_ride, 0.0);
        assert_eq!(metrics.by_source.platform.percentage, 0.0);
        assert_eq!(metrics.change_vs_previous, None);

        let cancellations = aggregate_cancellations(&[], &[]);
        assert_eq!(cancellations.rate, 0.0);

        let km = aggregate_kilometers(&[]);
        assert_eq!(km.average_per_ride, 0.0);
        assert_eq!(km.revenue_per_km, 0.0);
    }

    #[test]
    fn test_escenario_dos_viajes_sin_periodo_anterior() {
        let current = vec![
            ride(RideStatus::Completed, 15000.0, RideSource::Platform, 10.0, None),
            ride(RideStatus::Completed, 20000.0, RideSource::External, 12.0, None),
        ];
        let metrics = aggregate_rides(&current, &[]);

        assert_eq!(metrics.completed, 2);
        assert_eq!(metrics.total_revenue, 35000.0);
        assert_eq!(metrics.average_per_ride, 17500.0);
        assert_eq!(metrics.by_source.platform.count, 1);
        assert_eq!(metrics.by_source.platform.percentage, 50.0);
        assert_eq!(metrics.by_source.platform.revenue, 15000.0);
        assert_eq!(metrics.by_source.external.percentage, 50.0);
        assert_eq!(metrics.change_vs_previous, None);
    }

    #[test]
    fn test_delta_de_viajes_vs_periodo_anterior() {
        let current = vec![
            ride(RideStatus::Completed, 1000.0, RideSource::Platform, 5.0, None),
            ride(RideStatus::Completed, 1000.0, RideSource::Platform, 5.0, None),
            ride(RideStatus::Completed, 1000.0, RideSource::Platform, 5.0, None),
        ];
        let previous = vec![
            ride(RideStatus::Completed, 1000.0, RideSource::Platform, 5.0, None),
            ride(RideStatus::Completed, 1000.0, RideSource::Platform, 5.0, None),
        ];
        let metrics = aggregate_rides(&current, &previous);
        assert_eq!(metrics.change_vs_previous, Some(50.0));
    }

    #[test]
    fn test_cancelaciones_por_alias() {
        let current = vec![
            ride(RideStatus::Completed, 1000.0, RideSource::Platform, 5.0, None),
            cancelled_with_reason(Some("by_passenger")),
            cancelled_with_reason(Some("passenger")),
            cancelled_with_reason(Some("BY_DRIVER")),
            cancelled_with_reason(Some("driver")),
            cancelled_with_reason(Some("weather")),
            cancelled_with_reason(None),
        ];
        let metrics = aggregate_cancellations(&current, &[]);

        assert_eq!(metrics.total, 6);
        assert_eq!(metrics.by_reason.by_passenger, 2);
        assert_eq!(metrics.by_reason.by_driver, 2);
        assert_eq!(metrics.by_reason.other, 2);
        // 6 de 7 viajes terminados, a 1 decimal
        assert_eq!(metrics.rate, 85.7);
        assert_eq!(metrics.change_vs_previous, None);
    }

    #[test]
    fn test_delta_de_cancelaciones_en_puntos_porcentuales() {
        let current = vec![
            ride(RideStatus::Completed, 1000.0, RideSource::Platform, 5.0, None),
            cancelled_with_reason(Some("driver")),
        ];
        let previous = vec![
            ride(RideStatus::Completed, 1000.0, RideSource::Platform, 5.0, None),
            ride(RideStatus::Completed, 1000.0, RideSource::Platform, 5.0, None),
            ride(RideStatus::Completed, 1000.0, RideSource::Platform, 5.0, None),
            cancelled_with_reason(Some("driver")),
        ];
        let metrics = aggregate_cancellations(&current, &previous);
        // 50.0 actual - 25.0 anterior = +25.0 puntos
        assert_eq!(metrics.rate, 50.0);
        assert_eq!(metrics.change_vs_previous, Some(25.0));
    }

    #[test]
    fn test_kilometros_convierte_millas() {
        let mut en_millas = ride(RideStatus::Completed, 10000.0, RideSource::Platform, 10.0, None);
        en_millas.distance_unit = DistanceUnit::Miles;
        let en_km = ride(RideStatus::Completed, 10000.0, RideSource::Platform, 5.0, None);

        let metrics = aggregate_kilometers(&[en_millas, en_km]);
        // 10 millas = 16.0934 km + 5 km = 21.0934
        assert!((metrics.total_km - 21.0934).abs() < 1e-9);
        assert_eq!(metrics.average_per_ride, 10.5);
        assert_eq!(metrics.revenue_per_km, (20000.0 / 21.0934_f64).round());
    }

    #[test]
    fn test_finanzas_de_vehiculo_escenario() {
        let vehicle_id = Uuid::new_v4();
        let current = vec![ride(
            RideStatus::Completed,
            500000.0,
            RideSource::Platform,
            200.0,
            Some(vehicle_id),
        )];
        let finances = vec![VehicleFinanceRecord {
            vehicle: VehicleInfo {
                id: vehicle_id,
                plate: "XX-YY-11".to_string(),
                brand: Some("Kia".to_string()),
                model: Some("Rio".to_string()),
                year: Some(2020),
            },
            income: vec![],
            expenses: vec![
                ExpenseEntry {
                    category: "fuel".to_string(),
                    amount: 100000.0,
                    date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                },
                ExpenseEntry {
                    category: "maintenance".to_string(),
                    amount: 50000.0,
                    date: NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
                },
            ],
        }];

        let metrics = aggregate_vehicle_finances(&current, &finances);
        assert_eq!(metrics.len(), 1);
        let v = &metrics[0];
        assert_eq!(v.vehicle_name, "Kia Rio 2020");
        assert_eq!(v.rides_count, 1);
        assert_eq!(v.total_km, 200.0);
        assert_eq!(v.total_income, 500000.0);
        assert_eq!(v.total_expenses, 150000.0);
        assert_eq!(v.net_profit, 350000.0);
        assert_eq!(v.cost_per_km, 750.0);
        assert_eq!(v.top_expense_categories.len(), 2);
        assert_eq!(v.top_expense_categories[0].category, "fuel");
        assert_eq!(v.top_expense_categories[0].amount, 100000.0);
        assert_eq!(v.top_expense_categories[1].category, "maintenance");
    }

    #[test]
    fn test_top_categorias_estable_en_empates_y_corta_en_tres() {
        let vehicle_id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let expense = |category: &str, amount: f64| ExpenseEntry {
            category: category.to_string(),
            amount,
            date,
        };
        let finances = vec![VehicleFinanceRecord {
            vehicle: VehicleInfo {
                id: vehicle_id,
                plate: "ZZ-11".to_string(),
                brand: None,
                model: None,
                year: None,
            },
            income: vec![],
            expenses: vec![
                expense("tolls", 20000.0),
                expense("insurance", 20000.0),
                expense("fuel", 80000.0),
                expense("washing", 5000.0),
                expense("fuel", 20000.0),
            ],
        }];

        let metrics = aggregate_vehicle_finances(&[], &finances);
        let top = &metrics[0].top_expense_categories;
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].category, "fuel");
        assert_eq!(top[0].amount, 100000.0);
        // empate 20000 vs 20000: tolls apareció primero
        assert_eq!(top[1].category, "tolls");
        assert_eq!(top[2].category, "insurance");
    }

    #[test]
    fn test_vehiculos_ordenados_por_ingreso_descendente() {
        let id_a = Uuid::new_v4();
        let id_b = Uuid::new_v4();
        let record = |id: Uuid, plate: &str, income: f64| VehicleFinanceRecord {
            vehicle: VehicleInfo {
                id,
                plate: plate.to_string(),
                brand: None,
                model: None,
                year: None,
            },
            income: vec![IncomeEntry {
                entry_type: "rental".to_string(),
                amount: income,
                date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            }],
            expenses: vec![],
        };

        // orden de entrada al revés del esperado: la salida debe
        // ser determinista sin importar el orden de los fetches
        let metrics =
            aggregate_vehicle_finances(&[], &[record(id_a, "A", 100.0), record(id_b, "B", 900.0)]);
        assert_eq!(metrics[0].vehicle_name, "B");
        assert_eq!(metrics[1].vehicle_name, "A");
    }

    #[test]
    fn test_vehiculo_sin_kilometros_no_divide_por_cero() {
        let finances = vec![VehicleFinanceRecord {
            vehicle: VehicleInfo {
                id: Uuid::new_v4(),
                plate: "QQ-22".to_string(),
                brand: None,
                model: None,
                year: None,
            },
            income: vec![],
            expenses: vec![ExpenseEntry {
                category: "fuel".to_string(),
                amount: 10000.0,
                date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            }],
        }];
        let metrics = aggregate_vehicle_finances(&[], &finances);
        assert_eq!(metrics[0].cost_per_km, 0.0);
        assert_eq!(metrics[0].net_profit, -10000.0);
    }
}
