//! Orquestación de generación de insights
//!
//! Este módulo arma un prompt determinista a partir de las métricas
//! calculadas, llama una sola vez al servicio externo de generación de
//! texto y valida/parsea su respuesta JSON a registros tipados.
//!
//! El cliente del modelo se inyecta como dependencia explícita (trait
//! `TextGenerator`) - no hay singletons de proceso ni estado ambiente,
//! lo que permite tests deterministas. Sin lógica de retry en esta capa.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::environment::EnvironmentConfig;
use crate::models::insight::{Insight, InsightCategory, InsightPriority};
use crate::models::metrics::PeriodMetrics;
use crate::models::period::PeriodRange;
use crate::utils::errors::{AppError, AppResult};

/// Request hacia el colaborador de generación de texto
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_instructions: String,
    pub user_prompt: String,
    pub max_output_tokens: u32,
}

/// Colaborador de generación de texto - opaco, síncrono, sin retry
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Identificador del modelo, para la metadata del documento
    fn model_id(&self) -> &str;

    /// Una llamada, texto crudo de vuelta
    async fn generate(&self, request: &GenerationRequest) -> AppResult<String>;
}

/// Cliente de la API Gemini (generateContent)
pub struct GeminiClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Construir desde configuración. La credencial ausente es un error
    /// de configuración fatal: aborta antes de cualquier persistencia.
    pub fn from_config(config: &EnvironmentConfig) -> AppResult<Self> {
        let api_key = config
            .gemini_api_key
            .clone()
            .ok_or_else(|| AppError::Configuration("GEMINI_API_KEY no está definida".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            model: config.gemini_model.clone(),
            client,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> AppResult<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let body = serde_json::json!({
            "system_instruction": {
                "parts": [{ "text": request.system_instructions }]
            },
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.user_prompt }]
            }],
            "generationConfig": {
                "maxOutputTokens": request.max_output_tokens,
                "temperature": 0.2
            }
        });

        log::info!("📋 Enviando prompt al modelo {}", self.model);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Gemini response read failed: {}", e)))?;

        log::info!("📡 Gemini response status: {}", status);
        log::debug!("📄 Gemini response body: {}", response_text);

        if !status.is_success() {
            return Err(AppError::ExternalApi(format!(
                "Gemini API error {}: {}",
                status, response_text
            )));
        }

        let parsed: serde_json::Value = serde_json::from_str(&response_text)
            .map_err(|e| AppError::MalformedResponse(format!("invalid Gemini envelope: {}", e)))?;

        parsed["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                AppError::MalformedResponse("Gemini returned a non-text payload".to_string())
            })
    }
}

/// Formatear un monto con separador de miles (locale es: "1.234.567")
pub fn formato_miles(value: f64) -> String {
    let negative = value < 0.0;
    let digits = (value.abs().round() as i64).to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    if negative {
        format!("-{}", out)
    } else {
        out
    }
}

/// Formatear un delta porcentual con signo: "+15.0%", "-3.2%", "N/A"
pub fn formato_pct(value: Option<f64>) -> String {
    match value {
        Some(v) if v >= 0.0 => format!("+{:.1}%", v),
        Some(v) => format!("{:.1}%", v),
        None => "N/A".to_string(),
    }
}

/// Instrucciones fijas de sistema: contexto de dominio, esquema JSON
/// requerido y reglas de formato de locale
const SYSTEM_INSTRUCTIONS: &str = r#"Eres un analista de negocio de una operación de despacho de viajes. Recibes las métricas de un período y generas insights accionables en español.

Responde ÚNICAMENTE con un objeto JSON con esta forma exacta, sin texto adicional:
{
  "insights": [
    {
      "priority": "high" | "medium" | "low",
      "type": "trend" | "comparison" | "alert" | "efficiency" | "recommendation" | "milestone",
      "title": "título corto",
      "description": "explicación de 1-2 frases",
      "metric_reference": "métrica a la que refiere (ej: rides.total_revenue)",
      "value_change": número opcional con la variación porcentual
    }
  ]
}

Reglas:
- Entre 3 y 6 insights, los más relevantes primero.
- Montos en pesos, formateados con separador de miles (ej: 1.234.567).
- Porcentajes con un decimal y signo (ej: +15.0%).
- No inventes métricas que no estén en los datos entregados."#;

/// Servicio de orquestación de insights
pub struct InsightService {
    generator: Arc<dyn TextGenerator>,
    max_output_tokens: u32,
}

impl InsightService {
    pub fn new(generator: Arc<dyn TextGenerator>, max_output_tokens: u32) -> Self {
        Self {
            generator,
            max_output_tokens,
        }
    }

    pub fn model_id(&self) -> &str {
        self.generator.model_id()
    }

    /// Armar el mensaje de usuario: interpola cada métrica calculada,
    /// con separadores de miles y porcentajes con signo. Determinista
    /// para un mismo input.
    pub fn build_user_prompt(period: &PeriodRange, metrics: &PeriodMetrics) -> String {
        use std::fmt::Write;

        let mut prompt = String::new();
        let _ = writeln!(
            prompt,
            "Métricas del período {} ({}, id {}):",
            period.display_label, period.period_type, period.id
        );
        let _ = writeln!(prompt);

        let rides = &metrics.rides;
        let _ = writeln!(prompt, "VIAJES");
        let _ = writeln!(prompt, "- Totales: {}", rides.total);
        let _ = writeln!(
            prompt,
            "- Completados: {} (variación vs período anterior: {})",
            rides.completed,
            formato_pct(rides.change_vs_previous)
        );
        let _ = writeln!(
            prompt,
            "- Ingresos totales: ${} (promedio por viaje ${})",
            formato_miles(rides.total_revenue),
            formato_miles(rides.average_per_ride)
        );
        let _ = writeln!(
            prompt,
            "- Por origen: plataforma {} viajes (${}, {:.1}%), externos {} viajes (${}, {:.1}%)",
            rides.by_source.platform.count,
            formato_miles(rides.by_source.platform.revenue),
            rides.by_source.platform.percentage,
            rides.by_source.external.count,
            formato_miles(rides.by_source.external.revenue),
            rides.by_source.external.percentage
        );
        let _ = writeln!(prompt);

        let cancellations = &metrics.cancellations;
        let _ = writeln!(prompt, "CANCELACIONES");
        let _ = writeln!(
            prompt,
            "- Total: {} (tasa {:.1}%, variación {})",
            cancellations.total,
            cancellations.rate,
            formato_pct(cancellations.change_vs_previous)
        );
        let _ = writeln!(
            prompt,
            "- Por responsable: pasajero {}, conductor {}, otros {}",
            cancellations.by_reason.by_passenger,
            cancellations.by_reason.by_driver,
            cancellations.by_reason.other
        );
        let _ = writeln!(prompt);

        let km = &metrics.kilometers;
        let _ = writeln!(prompt, "KILÓMETROS");
        let _ = writeln!(
            prompt,
            "- Total: {:.1} km (promedio {:.1} km por viaje, ingreso por km ${})",
            km.total_km,
            km.average_per_ride,
            formato_miles(km.revenue_per_km)
        );

        if !metrics.vehicles.is_empty() {
            let _ = writeln!(prompt);
            let _ = writeln!(prompt, "VEHÍCULOS (P/L del período)");
            for vehicle in &metrics.vehicles {
                let _ = writeln!(
                    prompt,
                    "- {}: {} viajes, {:.1} km, ingresos ${}, gastos ${}, utilidad ${}, costo por km ${}",
                    vehicle.vehicle_name,
                    vehicle.rides_count,
                    vehicle.total_km,
                    formato_miles(vehicle.total_income),
                    formato_miles(vehicle.total_expenses),
                    formato_miles(vehicle.net_profit),
                    formato_miles(vehicle.cost_per_km)
                );
                for category in &vehicle.top_expense_categories {
                    let _ = writeln!(
                        prompt,
                        "  * {}: ${}",
                        category.category,
                        formato_miles(category.amount)
                    );
                }
            }
        }

        prompt
    }

    /// Generar los insights del período: una llamada al modelo,
    /// validación estricta de la respuesta, ids secuenciales
    pub async fn generate_insights(
        &self,
        period: &PeriodRange,
        metrics: &PeriodMetrics,
    ) -> AppResult<Vec<Insight>> {
        let request = GenerationRequest {
            system_instructions: SYSTEM_INSTRUCTIONS.to_string(),
            user_prompt: Self::build_user_prompt(period, metrics),
            max_output_tokens: self.max_output_tokens,
        };

        let raw = self.generator.generate(&request).await?;
        parse_insights(&period.id, &raw)
    }
}

/// Respuesta esperada del modelo
#[derive(Debug, Deserialize)]
struct InsightsResponse {
    insights: Vec<RawInsight>,
}

#[derive(Debug, Deserialize)]
struct RawInsight {
    priority: InsightPriority,
    #[serde(rename = "type")]
    insight_type: InsightCategory,
    title: String,
    description: String,
    metric_reference: String,
    #[serde(default)]
    value_change: Option<f64>,
}

/// Quitar el wrapper de code fence si el modelo lo agregó
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    // la primera línea es ``` o ```json; el cierre es ``` al final
    let rest = match trimmed.find('\n') {
        Some(pos) => &trimmed[pos + 1..],
        None => return trimmed,
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parsear la respuesta del modelo a insights tipados
///
/// Asigna `id = "{periodId}-{index}"` secuencial sobre el arreglo
/// parseado; no reordena ni revalida el contenido más allá del chequeo
/// de forma. Cualquier payload malformado es fatal - el texto crudo va
/// solo a logs de diagnóstico, nunca al documento persistido.
pub fn parse_insights(period_id: &str, raw: &str) -> AppResult<Vec<Insight>> {
    let cleaned = strip_code_fences(raw);

    let response: InsightsResponse = serde_json::from_str(cleaned).map_err(|e| {
        log::error!("❌ Respuesta del modelo no parseable: {}", raw);
        AppError::MalformedResponse(format!("invalid insights JSON: {}", e))
    })?;

    Ok(response
        .insights
        .into_iter()
        .enumerate()
        .map(|(index, raw)| Insight {
            id: format!("{}-{}", period_id, index + 1),
            priority: raw.priority,
            insight_type: raw.insight_type,
            title: raw.title,
            description: raw.description,
            metric_reference: raw.metric_reference,
            value_change: raw.value_change,
        })
        .collect())
}
