//! Pipeline de generación de reportes
//!
//! Este módulo secuencia las cuatro etapas del reporte de período:
//! agregar -> generar insights -> persistir -> notificar. Cada etapa
//! exige el éxito completo de la anterior; la notificación es el único
//! paso best-effort (se loguea y nunca hace fallar la corrida).
//!
//! Re-ejecutar el pipeline para el mismo período es seguro: la
//! persistencia es un upsert de documento completo bajo la misma clave
//! (last-writer-wins, sin merge).

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::models::insight::{GenerationMetadata, InsightsDocument};
use crate::models::period::PeriodRange;
use crate::models::ride::RideRecord;
use crate::models::vehicle::VehicleFinanceRecord;
use crate::services::insight_service::InsightService;
use crate::services::metrics_aggregator::aggregate_period_metrics;
use crate::services::period_calculator::get_previous_period;
use crate::utils::errors::{AppError, AppResult};

/// Colaborador de datos de viajes (solo lectura)
#[async_trait]
pub trait RideDataSource: Send + Sync {
    /// Viajes con timestamp en `[from, to)` (instantes half-open)
    async fn rides_in_range(
        &self,
        from: NaiveDateTime,
        to_exclusive: NaiveDateTime,
    ) -> AppResult<Vec<RideRecord>>;

    /// Ingresos/gastos registrados y atributos de presentación de un
    /// vehículo, acotados a un rango de fechas
    async fn vehicle_finance(
        &self,
        vehicle_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<VehicleFinanceRecord>;
}

/// Colaborador de persistencia del documento de insights
#[async_trait]
pub trait InsightsStore: Send + Sync {
    /// Upsert de documento completo por clave (sobreescribe, no mergea)
    async fn upsert(&self, document: &InsightsDocument) -> AppResult<()>;

    async fn get(&self, key: &str) -> AppResult<Option<InsightsDocument>>;

    /// Listado ordenado por recencia de generación
    async fn recent(&self, limit: i64) -> AppResult<Vec<InsightsDocument>>;
}

/// Colaborador de notificaciones - fire and forget
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_document(&self, document: &InsightsDocument) -> AppResult<()>;
}

/// Flags de ejecución del pipeline
#[derive(Debug, Clone, Copy)]
pub struct PipelineFlags {
    /// La etapa de finanzas por vehículo se omite en corridas diarias
    pub include_vehicle_finance: bool,
}

/// Conteos de registros leídos en la etapa de agregación
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecordCounts {
    pub current_rides: usize,
    pub previous_rides: usize,
    pub vehicles: usize,
}

/// Resultado de una corrida completa
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub success: bool,
    pub document_id: String,
    pub record_counts: RecordCounts,
    /// Medido de punta a punta, incluida la latencia del modelo
    pub duration_ms: i64,
}

/// Orquestador de las cuatro etapas
pub struct ReportPipeline {
    data_source: Arc<dyn RideDataSource>,
    store: Arc<dyn InsightsStore>,
    notifier: Arc<dyn Notifier>,
    insights: InsightService,
    /// Deadline para la etapa 2 (la llamada al modelo)
    generation_timeout: Duration,
}

impl ReportPipeline {
    pub fn new(
        data_source: Arc<dyn RideDataSource>,
        store: Arc<dyn InsightsStore>,
        notifier: Arc<dyn Notifier>,
        insights: InsightService,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            data_source,
            store,
            notifier,
            insights,
            generation_timeout,
        }
    }

    /// Ejecutar el pipeline completo para un período ya resuelto
    pub async fn run(&self, period: &PeriodRange, flags: PipelineFlags) -> AppResult<PipelineResult> {
        let started = Instant::now();
        log::info!(
            "🚀 Generando reporte {} ({})",
            period.storage_key(),
            period.display_label
        );

        // Etapa 1: agregación
        let previous = get_previous_period(period.period_type, period.start.date());

        let current_rides = self
            .data_source
            .rides_in_range(period.start, exclusive_end(period.end))
            .await?;
        let previous_rides = self
            .data_source
            .rides_in_range(previous.start, exclusive_end(previous.end))
            .await?;

        let finances = if flags.include_vehicle_finance {
            self.fetch_vehicle_finances(&current_rides, period).await?
        } else {
            Vec::new()
        };

        let record_counts = RecordCounts {
            current_rides: current_rides.len(),
            previous_rides: previous_rides.len(),
            vehicles: finances.len(),
        };
        log::info!(
            "📊 Agregando métricas: {} viajes actuales, {} anteriores, {} vehículos",
            record_counts.current_rides,
            record_counts.previous_rides,
            record_counts.vehicles
        );

        let metrics = aggregate_period_metrics(&current_rides, &previous_rides, &finances);

        // Etapa 2: generación - cualquier falla aborta sin persistir nada
        let insights = tokio::time::timeout(
            self.generation_timeout,
            self.insights.generate_insights(period, &metrics),
        )
        .await
        .map_err(|_| {
            AppError::ExternalApi(format!(
                "insight generation timed out after {}s",
                self.generation_timeout.as_secs()
            ))
        })??;

        log::info!("💡 {} insights generados", insights.len());

        // Etapa 3: persistencia - upsert de documento completo
        let document = InsightsDocument {
            id: period.storage_key(),
            period_type: period.period_type,
            period_id: period.id.clone(),
            display_label: period.display_label.clone(),
            period_start: period.start,
            period_end: period.end,
            metrics,
            insights,
            metadata: GenerationMetadata {
                generated_at: Utc::now(),
                model: self.insights.model_id().to_string(),
                duration_ms: started.elapsed().as_millis() as i64,
            },
        };
        self.store.upsert(&document).await?;
        log::info!("💾 Documento {} persistido", document.id);

        // Etapa 4: notificación best-effort - nunca revierte la etapa 3
        if let Err(e) = self.notifier.notify_document(&document).await {
            log::warn!("⚠️ Notificación falló para {}: {}", document.id, e);
        }

        Ok(PipelineResult {
            success: true,
            document_id: document.id,
            record_counts,
            duration_ms: started.elapsed().as_millis() as i64,
        })
    }

    /// Lecturas de finanzas por vehículo: independientes, de solo
    /// lectura, pueden correr concurrentes. El orden de término es
    /// irrelevante porque el agregador reordena por total_income.
    async fn fetch_vehicle_finances(
        &self,
        current_rides: &[RideRecord],
        period: &PeriodRange,
    ) -> AppResult<Vec<VehicleFinanceRecord>> {
        let mut vehicle_ids: Vec<Uuid> = Vec::new();
        for ride in current_rides {
            if let Some(id) = ride.vehicle_id {
                if !vehicle_ids.contains(&id) {
                    vehicle_ids.push(id);
                }
            }
        }

        let fetches = vehicle_ids.iter().map(|&id| {
            self.data_source
                .vehicle_finance(id, period.start.date(), period.end.date())
        });
        futures::future::try_join_all(fetches).await
    }
}

/// El rango del período cierra en 23:59:59.999; el data source trabaja
/// con instantes half-open `[start, end)`
fn exclusive_end(end: NaiveDateTime) -> NaiveDateTime {
    end + ChronoDuration::milliseconds(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::period::PeriodType;
    use crate::models::ride::{DistanceUnit, RideSource, RideStatus};
    use crate::models::vehicle::VehicleInfo;
    use crate::services::insight_service::{GenerationRequest, TextGenerator};
    use crate::services::period_calculator::get_period_range;
    use chrono::{NaiveDate, TimeZone};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeDataSource {
        rides: Vec<RideRecord>,
        fail: bool,
    }

    #[async_trait]
    impl RideDataSource for FakeDataSource {
        async fn rides_in_range(
            &self,
            from: NaiveDateTime,
            to_exclusive: NaiveDateTime,
        ) -> AppResult<Vec<RideRecord>> {
            if self.fail {
                return Err(AppError::Internal("data source down".to_string()));
            }
            Ok(self
                .rides
                .iter()
                .filter(|r| {
                    let at = r.ride_at.naive_utc();
                    at >= from && at < to_exclusive
                })
                .cloned()
                .collect())
        }

        async fn vehicle_finance(
            &self,
            vehicle_id: Uuid,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> AppResult<VehicleFinanceRecord> {
            Ok(VehicleFinanceRecord {
                vehicle: VehicleInfo {
                    id: vehicle_id,
                    plate: "TEST-01".to_string(),
                    brand: None,
                    model: None,
                    year: None,
                },
                income: vec![],
                expenses: vec![],
            })
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        documents: Mutex<HashMap<String, InsightsDocument>>,
    }

    #[async_trait]
    impl InsightsStore for MemoryStore {
        async fn upsert(&self, document: &InsightsDocument) -> AppResult<()> {
            self.documents
                .lock()
                .unwrap()
                .insert(document.id.clone(), document.clone());
            Ok(())
        }

        async fn get(&self, key: &str) -> AppResult<Option<InsightsDocument>> {
            Ok(self.documents.lock().unwrap().get(key).cloned())
        }

        async fn recent(&self, limit: i64) -> AppResult<Vec<InsightsDocument>> {
            let mut docs: Vec<InsightsDocument> =
                self.documents.lock().unwrap().values().cloned().collect();
            docs.sort_by(|a, b| b.metadata.generated_at.cmp(&a.metadata.generated_at));
            docs.truncate(limit as usize);
            Ok(docs)
        }
    }

    struct CountingNotifier {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn notify_document(&self, _document: &InsightsDocument) -> AppResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::Internal("notification channel down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct FakeGenerator {
        response: String,
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        fn model_id(&self) -> &str {
            "fake-model"
        }

        async fn generate(&self, _request: &GenerationRequest) -> AppResult<String> {
            Ok(self.response.clone())
        }
    }

    const RESPUESTA: &str = r#"{"insights":[{"priority":"high","type":"trend","title":"t","description":"d","metric_reference":"rides.total"}]}"#;

    fn ride_en(fecha: NaiveDate, vehicle_id: Option<Uuid>) -> RideRecord {
        RideRecord {
            driver_id: Uuid::new_v4(),
            vehicle_id,
            ride_at: chrono::Utc
                .from_utc_datetime(&fecha.and_hms_opt(12, 0, 0).unwrap()),
            status: RideStatus::Completed,
            cancellation_reason: None,
            source: RideSource::Platform,
            fare_received: 10000.0,
            commission: 2000.0,
            total_paid: 10000.0,
            distance_value: 8.0,
            distance_unit: DistanceUnit::Km,
        }
    }

    fn pipeline(
        rides: Vec<RideRecord>,
        response: &str,
        notifier_fails: bool,
    ) -> (ReportPipeline, Arc<MemoryStore>, Arc<CountingNotifier>) {
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(CountingNotifier {
            fail: notifier_fails,
            calls: AtomicUsize::new(0),
        });
        let service = InsightService::new(
            Arc::new(FakeGenerator {
                response: response.to_string(),
            }),
            2048,
        );
        let pipeline = ReportPipeline::new(
            Arc::new(FakeDataSource { rides, fail: false }),
            store.clone(),
            notifier.clone(),
            service,
            Duration::from_secs(5),
        );
        (pipeline, store, notifier)
    }

    fn periodo_semana() -> PeriodRange {
        get_period_range(PeriodType::Weekly, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap())
    }

    #[tokio::test]
    async fn test_corrida_completa_persiste_y_notifica() {
        let vehicle_id = Uuid::new_v4();
        let rides = vec![
            ride_en(NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(), Some(vehicle_id)),
            ride_en(NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(), None), // período anterior
        ];
        let (pipeline, store, notifier) = pipeline(rides, RESPUESTA, false);

        let result = pipeline
            .run(&periodo_semana(), PipelineFlags { include_vehicle_finance: true })
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.document_id, "weekly_2026-W02");
        assert_eq!(
            result.record_counts,
            RecordCounts { current_rides: 1, previous_rides: 1, vehicles: 1 }
        );

        let doc = store.get("weekly_2026-W02").await.unwrap().unwrap();
        assert_eq!(doc.insights.len(), 1);
        assert_eq!(doc.insights[0].id, "2026-W02-1");
        assert_eq!(doc.metadata.model, "fake-model");
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_flag_omite_finanzas_de_vehiculos() {
        let vehicle_id = Uuid::new_v4();
        let rides = vec![ride_en(
            NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            Some(vehicle_id),
        )];
        let (pipeline, store, _) = pipeline(rides, RESPUESTA, false);

        let result = pipeline
            .run(&periodo_semana(), PipelineFlags { include_vehicle_finance: false })
            .await
            .unwrap();

        assert_eq!(result.record_counts.vehicles, 0);
        let doc = store.get("weekly_2026-W02").await.unwrap().unwrap();
        assert!(doc.metrics.vehicles.is_empty());
    }

    #[tokio::test]
    async fn test_generacion_fallida_no_persiste_nada() {
        let rides = vec![ride_en(NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(), None)];
        let (pipeline, store, notifier) = pipeline(rides, "no soy JSON", false);

        let result = pipeline
            .run(&periodo_semana(), PipelineFlags { include_vehicle_finance: true })
            .await;

        assert!(matches!(result, Err(AppError::MalformedResponse(_))));
        assert!(store.get("weekly_2026-W02").await.unwrap().is_none());
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_notificacion_fallida_no_hace_fallar_la_corrida() {
        let rides = vec![ride_en(NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(), None)];
        let (pipeline, store, notifier) = pipeline(rides, RESPUESTA, true);

        let result = pipeline
            .run(&periodo_semana(), PipelineFlags { include_vehicle_finance: true })
            .await
            .unwrap();

        assert!(result.success);
        assert!(store.get("weekly_2026-W02").await.unwrap().is_some());
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_regenerar_es_idempotente_en_el_storage() {
        let rides = vec![ride_en(NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(), None)];
        let (pipeline, store, _) = pipeline(rides, RESPUESTA, false);
        let periodo = periodo_semana();
        let flags = PipelineFlags { include_vehicle_finance: true };

        pipeline.run(&periodo, flags).await.unwrap();
        let primera = store.get("weekly_2026-W02").await.unwrap().unwrap();

        pipeline.run(&periodo, flags).await.unwrap();
        let documentos = store.recent(10).await.unwrap();
        assert_eq!(documentos.len(), 1);
        // el contenido queda el de la última corrida
        assert!(documentos[0].metadata.generated_at >= primera.metadata.generated_at);
    }
}
